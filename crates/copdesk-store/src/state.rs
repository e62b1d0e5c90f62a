use std::collections::HashMap;

use copdesk_core::model::Release;
use copdesk_core::profile::ProfileGroup;
use copdesk_core::status::TaskStatus;

/// Releases and their task statuses.
///
/// `task_statuses` is a side table keyed by release id then task id; a task
/// with no entry has never reported (Ready). Map order is storage order only,
/// presentation order is always selector-derived.
#[derive(Debug, Clone, Default)]
pub struct TasksState {
    /// Whether the initial full release fetch has completed.
    pub loaded: bool,
    pub releases: HashMap<String, Release>,
    pub task_statuses: HashMap<String, HashMap<String, TaskStatus>>,

    pub(crate) releases_rev: u64,
    pub(crate) statuses_rev: u64,
}

impl TasksState {
    /// Revision of the release collection, bumped on every actual mutation.
    pub fn releases_rev(&self) -> u64 {
        self.releases_rev
    }

    /// Revision of the status side table, bumped on every actual mutation.
    pub fn statuses_rev(&self) -> u64 {
        self.statuses_rev
    }
}

/// Profile groups and their profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfilesState {
    /// Whether the initial full group fetch has completed.
    pub loaded: bool,
    pub groups: HashMap<String, ProfileGroup>,

    pub(crate) groups_rev: u64,
}

impl ProfilesState {
    /// Revision of the group collection, bumped on every actual mutation.
    pub fn groups_rev(&self) -> u64 {
        self.groups_rev
    }
}

/// The whole client-side cache.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub tasks: TasksState,
    pub profiles: ProfilesState,
}
