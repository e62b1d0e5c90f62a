use serde::{Deserialize, Serialize};

/// Kind of task log entry emitted by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogEntryKind {
    #[serde(rename = "new_proxy_acquired")]
    NewProxyAcquired,
    #[serde(rename = "current_profile_updated")]
    CurrentProfileUpdated,
    #[serde(rename = "new_profile")]
    NewProfile,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "task_update")]
    TaskUpdate,
    #[serde(rename = "status_changed")]
    StatusChanged,
}

/// One entry of a task's execution log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: LogEntryKind,
    /// Kind-specific payload, opaque to the client.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Backend-formatted timestamp.
    pub timestamp: String,
}
