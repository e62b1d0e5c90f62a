//! Request/response bodies of the backend API, one pair per endpoint.
//!
//! Patch types carry one `Option` per mutable field and shallow-merge into
//! the target via `apply`: fields present in the patch overwrite, absent
//! fields are left untouched.

use serde::{Deserialize, Serialize};

use crate::log::LogEntry;
use crate::model::{Release, TaskDefinition, TaskProfileRef};
use crate::profile::{BillingAddress, PaymentCard, Profile, ProfileGroup, ShippingAddress};

/// `POST /releases`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseRequest {
    pub name: String,
    pub site: String,
}

/// Partial release update, `PATCH /releases/:id`.
///
/// Task membership is managed through the batch endpoints, and `prev_number`
/// is backend-assigned, so neither appears here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_delay: Option<u64>,
}

impl ReleasePatch {
    /// Shallow-merges this patch into `release`.
    pub fn apply(&self, release: &mut Release) {
        if let Some(name) = &self.name {
            release.name = name.clone();
        }
        if let Some(site) = &self.site {
            release.site = site.clone();
        }
        if let Some(proxy_list) = &self.proxy_list {
            release.proxy_list = proxy_list.clone();
        }
        if let Some(options) = &self.options {
            release.options = options.clone();
        }
        if let Some(monitor_delay) = self.monitor_delay {
            release.monitor_delay = monitor_delay;
        }
        if let Some(error_delay) = self.error_delay {
            release.error_delay = error_delay;
        }
    }
}

/// Task payload for batch creation (id and ordinal are backend-assigned).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub sizes: Vec<String>,
    pub profile: TaskProfileRef,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// `POST /releases/:id/tasks/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTasksRequest {
    pub tasks: Vec<NewTask>,
}

/// Response to [`AddTasksRequest`] and [`UpdateTasksRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBatchResponse {
    pub tasks: Vec<TaskDefinition>,
}

/// `DELETE /releases/:id/tasks/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTasksRequest {
    pub task_ids: Vec<String>,
}

/// Partial task update, applied positionally alongside its task id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<TaskProfileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TaskPatch {
    /// Shallow-merges this patch into `task`.
    pub fn apply(&self, task: &mut TaskDefinition) {
        if let Some(sizes) = &self.sizes {
            task.sizes = sizes.clone();
        }
        if let Some(profile) = &self.profile {
            task.profile = profile.clone();
        }
        if let Some(options) = &self.options {
            task.options = options.clone();
        }
    }
}

/// `PATCH /releases/:id/tasks/batch` — `task_ids[i]` pairs with `updates[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTasksRequest {
    pub task_ids: Vec<String>,
    pub updates: Vec<TaskPatch>,
}

/// `POST /releases/:id/tasks/start` and `.../stop`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSelection {
    pub task_ids: Vec<String>,
}

/// `GET /releases/:id/tasks/:tid/log`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLogResponse {
    pub entries: Vec<LogEntry>,
}

/// `POST /profile_groups`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileGroupRequest {
    pub name: String,
}

/// Partial profile-group update, `PATCH /profile_groups/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileGroupPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProfileGroupPatch {
    /// Shallow-merges this patch into `group`.
    pub fn apply(&self, group: &mut ProfileGroup) {
        if let Some(name) = &self.name {
            group.name = name.clone();
        }
    }
}

/// Profile payload for batch creation (id is backend-assigned).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub shipping: ShippingAddress,
    pub billing: BillingAddress,
    pub card: PaymentCard,
}

/// `POST /profile_groups/:id/profiles/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddProfilesRequest {
    pub profiles: Vec<NewProfile>,
}

/// Response to [`AddProfilesRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddProfilesResponse {
    pub profiles: Vec<Profile>,
}

/// `DELETE /profile_groups/:id/profiles/batch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveProfilesRequest {
    pub profile_ids: Vec<String>,
}

/// Partial profile update, `PATCH /profile_groups/:id/profiles/:pid`.
///
/// Merge is shallow at the top level: a present `shipping`/`billing`/`card`
/// replaces that record wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<PaymentCard>,
}

impl ProfilePatch {
    /// Shallow-merges this patch into `profile`.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(shipping) = &self.shipping {
            profile.shipping = shipping.clone();
        }
        if let Some(billing) = &self.billing {
            profile.billing = billing.clone();
        }
        if let Some(card) = &self.card {
            profile.card = card.clone();
        }
    }
}

/// `POST /profile_groups/import`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub filepath: String,
}

/// Response to [`ImportRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: Vec<ProfileGroup>,
}

/// `POST /profile_groups/export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub filepath: String,
}
