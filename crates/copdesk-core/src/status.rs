use serde::{Deserialize, Serialize};

/// Execution status reported for a task by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Finished,
    Failed,
    Cancelled,
    Waiting,
    WaitingForProxy,
    Running,
}

/// Status record for one task, stored separately from its definition.
///
/// A task with no status record has never reported and is considered Ready.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    /// The reported status kind.
    pub status: StatusKind,
    /// Kind-specific payload, opaque to the client.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Coarse classification of a task's execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionClass {
    /// No status record yet; the task can be started.
    Ready,
    /// In flight (running or waiting on the monitor/proxy pool).
    Running,
    /// Terminal (finished, failed, or cancelled); can be restarted.
    Stopped,
}

impl ExecutionClass {
    /// Classifies a status record (or its absence) into an execution class.
    pub fn of(status: Option<&TaskStatus>) -> Self {
        match status {
            None => Self::Ready,
            Some(s) => match s.status {
                StatusKind::Finished | StatusKind::Failed | StatusKind::Cancelled => Self::Stopped,
                StatusKind::Waiting | StatusKind::WaitingForProxy | StatusKind::Running => {
                    Self::Running
                }
            },
        }
    }
}

/// Human-readable label for a status kind, `"Ready"` when absent.
pub fn status_label(status: Option<StatusKind>) -> &'static str {
    match status {
        None => "Ready",
        Some(StatusKind::Finished) => "Finished",
        Some(StatusKind::Failed) => "Failed",
        Some(StatusKind::Cancelled) => "Cancelled",
        Some(StatusKind::Waiting) => "Waiting",
        Some(StatusKind::WaitingForProxy) => "Waiting for proxy",
        Some(StatusKind::Running) => "Running",
    }
}
