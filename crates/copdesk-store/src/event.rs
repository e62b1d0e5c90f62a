use std::collections::HashMap;
use std::fmt;

use copdesk_api::ApiError;
use copdesk_core::api::{
    CreateProfileGroupRequest, CreateReleaseRequest, NewProfile, NewTask, ProfileGroupPatch,
    ProfilePatch, ReleasePatch, TaskPatch,
};
use copdesk_core::model::{Release, StatusUpdate, TaskDefinition};
use copdesk_core::profile::{Profile, ProfileGroup};

/// Three-phase lifecycle of one remote operation.
///
/// `Requested` is emitted before the call goes out and carries the original
/// arguments, so reducers can apply optimistic transitions. `Succeeded`
/// carries both the arguments and the server payload. For one operation,
/// `Requested` always precedes its own `Succeeded`/`Failed`; across
/// operations, delivery follows completion order.
#[derive(Debug, Clone)]
pub enum Lifecycle<A, P> {
    Requested(A),
    Succeeded(A, P),
    Failed(A, CallError),
}

/// Cloneable projection of an [`ApiError`], carried inside events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    pub message: String,
    pub details: String,
}

impl From<&ApiError> for CallError {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Api { message, details } => Self {
                message: message.clone(),
                details: details.clone(),
            },
            other => Self {
                message: other.to_string(),
                details: String::new(),
            },
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Arguments of a release update.
#[derive(Debug, Clone)]
pub struct UpdateReleaseArgs {
    pub id: String,
    pub patch: ReleasePatch,
}

/// Arguments of a batch task add.
#[derive(Debug, Clone)]
pub struct AddTasksArgs {
    pub release_id: String,
    pub tasks: Vec<NewTask>,
}

/// Arguments of a batch task removal.
#[derive(Debug, Clone)]
pub struct RemoveTasksArgs {
    pub release_id: String,
    pub task_ids: Vec<String>,
}

/// One task id paired with its partial update.
#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub id: String,
    pub patch: TaskPatch,
}

/// Arguments of a batch task update.
#[derive(Debug, Clone)]
pub struct UpdateTasksArgs {
    pub release_id: String,
    pub updates: Vec<TaskUpdate>,
}

/// Arguments of a start/stop command.
#[derive(Debug, Clone)]
pub struct TaskSelectionArgs {
    pub release_id: String,
    pub task_ids: Vec<String>,
}

/// Events touching the releases/tasks slice.
#[derive(Debug, Clone)]
pub enum TasksEvent {
    LoadReleases(Lifecycle<(), HashMap<String, Release>>),
    CreateRelease(Lifecycle<CreateReleaseRequest, Release>),
    DeleteRelease(Lifecycle<String, ()>),
    UpdateRelease(Lifecycle<UpdateReleaseArgs, Release>),
    AddTasks(Lifecycle<AddTasksArgs, Vec<TaskDefinition>>),
    RemoveTasks(Lifecycle<RemoveTasksArgs, ()>),
    UpdateTasks(Lifecycle<UpdateTasksArgs, Vec<TaskDefinition>>),
    StartTasks(Lifecycle<TaskSelectionArgs, ()>),
    StopTasks(Lifecycle<TaskSelectionArgs, ()>),
    /// Push-driven status batch; not a request/response lifecycle.
    StatusBatch(Vec<StatusUpdate>),
}

/// Arguments of a profile-group update.
#[derive(Debug, Clone)]
pub struct UpdateGroupArgs {
    pub id: String,
    pub patch: ProfileGroupPatch,
}

/// Arguments of a batch profile add.
#[derive(Debug, Clone)]
pub struct AddProfilesArgs {
    pub group_id: String,
    pub profiles: Vec<NewProfile>,
}

/// Arguments of a batch profile removal.
#[derive(Debug, Clone)]
pub struct RemoveProfilesArgs {
    pub group_id: String,
    pub profile_ids: Vec<String>,
}

/// Arguments of a single-profile update.
#[derive(Debug, Clone)]
pub struct UpdateProfileArgs {
    pub group_id: String,
    pub profile_id: String,
    pub patch: ProfilePatch,
}

/// Events touching the profiles slice.
#[derive(Debug, Clone)]
pub enum ProfilesEvent {
    LoadGroups(Lifecycle<(), HashMap<String, ProfileGroup>>),
    CreateGroup(Lifecycle<CreateProfileGroupRequest, ProfileGroup>),
    DeleteGroup(Lifecycle<String, ()>),
    UpdateGroup(Lifecycle<UpdateGroupArgs, ProfileGroup>),
    AddProfiles(Lifecycle<AddProfilesArgs, Vec<Profile>>),
    RemoveProfiles(Lifecycle<RemoveProfilesArgs, ()>),
    UpdateProfile(Lifecycle<UpdateProfileArgs, Profile>),
}

/// Any store event.
#[derive(Debug, Clone)]
pub enum Event {
    Tasks(TasksEvent),
    Profiles(ProfilesEvent),
}
