use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::status::TaskStatus;

/// A named batch of automation tasks targeted at one site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Server-assigned opaque id.
    pub id: String,
    /// Human name.
    pub name: String,
    /// Target site.
    pub site: String,
    /// Name of the proxy list used by tasks in this release.
    pub proxy_list: String,
    /// Highest task ordinal handed out so far. Ordinals are never re-used.
    pub prev_number: u32,
    /// Site-specific release options, opaque to the client.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Tasks owned by this release, keyed by task id.
    #[serde(default)]
    pub tasks: HashMap<String, TaskDefinition>,
    /// Monitor poll delay in milliseconds.
    pub monitor_delay: u64,
    /// Delay after an error before retrying, in milliseconds.
    pub error_delay: u64,
}

/// One unit of automated work within a release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    /// Server-assigned opaque id.
    pub id: String,
    /// Per-release ordinal, assigned monotonically by the backend.
    pub number: u32,
    /// Sizes the task will attempt, in preference order.
    pub sizes: Vec<String>,
    /// Profile used for checkout.
    pub profile: TaskProfileRef,
    /// Task-specific options, opaque to the client.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Reference to a profile within a profile group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskProfileRef {
    /// Owning profile group id.
    pub group_id: String,
    /// Profile id within the group.
    pub id: String,
}

/// Inbound status tuple from the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub release_id: String,
    pub task_id: String,
    pub status: TaskStatus,
}

/// A task paired with its current status, as presented to consumers.
///
/// `status` is `None` for tasks that have never reported (Ready).
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub definition: TaskDefinition,
    pub status: Option<TaskStatus>,
}
