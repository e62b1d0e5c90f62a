//! Wraps every remote operation in the three-phase lifecycle: `Requested`
//! goes to the store before the call, `Succeeded`/`Failed` after it
//! resolves, and the result is also returned to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use copdesk_api::{ApiClient, ApiError};
use copdesk_core::api::{
    CreateProfileGroupRequest, CreateReleaseRequest, ImportResponse, NewProfile, NewTask,
    ProfileGroupPatch, ProfilePatch, ReleasePatch, TaskLogResponse, TaskPatch,
};
use copdesk_core::model::{Release, TaskDefinition};
use copdesk_core::profile::{Profile, ProfileGroup};

use crate::event::{
    AddProfilesArgs, AddTasksArgs, CallError, Event, Lifecycle, ProfilesEvent, RemoveProfilesArgs,
    RemoveTasksArgs, TaskSelectionArgs, TaskUpdate, TasksEvent, UpdateGroupArgs, UpdateProfileArgs,
    UpdateReleaseArgs, UpdateTasksArgs,
};

/// Remote API surface the dispatcher drives.
///
/// [`ApiClient`] is the production implementation; tests script their own.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list_releases(&self) -> Result<HashMap<String, Release>, ApiError>;
    async fn create_release(&self, req: &CreateReleaseRequest) -> Result<Release, ApiError>;
    async fn delete_release(&self, id: &str) -> Result<(), ApiError>;
    async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Release, ApiError>;
    async fn add_tasks(
        &self,
        release_id: &str,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<TaskDefinition>, ApiError>;
    async fn remove_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError>;
    async fn update_tasks(
        &self,
        release_id: &str,
        task_ids: Vec<String>,
        updates: Vec<TaskPatch>,
    ) -> Result<Vec<TaskDefinition>, ApiError>;
    async fn start_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError>;
    async fn stop_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError>;
    async fn poll_task_log(
        &self,
        release_id: &str,
        task_id: &str,
        after: Option<&str>,
    ) -> Result<TaskLogResponse, ApiError>;

    async fn list_profile_groups(&self) -> Result<HashMap<String, ProfileGroup>, ApiError>;
    async fn create_profile_group(
        &self,
        req: &CreateProfileGroupRequest,
    ) -> Result<ProfileGroup, ApiError>;
    async fn delete_profile_group(&self, id: &str) -> Result<(), ApiError>;
    async fn update_profile_group(
        &self,
        id: &str,
        patch: &ProfileGroupPatch,
    ) -> Result<ProfileGroup, ApiError>;
    async fn add_profiles(
        &self,
        group_id: &str,
        profiles: Vec<NewProfile>,
    ) -> Result<Vec<Profile>, ApiError>;
    async fn remove_profiles(
        &self,
        group_id: &str,
        profile_ids: Vec<String>,
    ) -> Result<(), ApiError>;
    async fn update_profile(
        &self,
        group_id: &str,
        profile_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile, ApiError>;
    async fn import_profile_groups(&self, filepath: &str) -> Result<ImportResponse, ApiError>;
    async fn export_profile_groups(&self, filepath: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl Remote for ApiClient {
    async fn list_releases(&self) -> Result<HashMap<String, Release>, ApiError> {
        ApiClient::list_releases(self).await
    }
    async fn create_release(&self, req: &CreateReleaseRequest) -> Result<Release, ApiError> {
        ApiClient::create_release(self, req).await
    }
    async fn delete_release(&self, id: &str) -> Result<(), ApiError> {
        ApiClient::delete_release(self, id).await
    }
    async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Release, ApiError> {
        ApiClient::update_release(self, id, patch).await
    }
    async fn add_tasks(
        &self,
        release_id: &str,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        ApiClient::add_tasks(self, release_id, tasks).await.map(|r| r.tasks)
    }
    async fn remove_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        ApiClient::remove_tasks(self, release_id, task_ids).await
    }
    async fn update_tasks(
        &self,
        release_id: &str,
        task_ids: Vec<String>,
        updates: Vec<TaskPatch>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        ApiClient::update_tasks(self, release_id, task_ids, updates)
            .await
            .map(|r| r.tasks)
    }
    async fn start_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        ApiClient::start_tasks(self, release_id, task_ids).await
    }
    async fn stop_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        ApiClient::stop_tasks(self, release_id, task_ids).await
    }
    async fn poll_task_log(
        &self,
        release_id: &str,
        task_id: &str,
        after: Option<&str>,
    ) -> Result<TaskLogResponse, ApiError> {
        ApiClient::poll_task_log(self, release_id, task_id, after).await
    }

    async fn list_profile_groups(&self) -> Result<HashMap<String, ProfileGroup>, ApiError> {
        ApiClient::list_profile_groups(self).await
    }
    async fn create_profile_group(
        &self,
        req: &CreateProfileGroupRequest,
    ) -> Result<ProfileGroup, ApiError> {
        ApiClient::create_profile_group(self, req).await
    }
    async fn delete_profile_group(&self, id: &str) -> Result<(), ApiError> {
        ApiClient::delete_profile_group(self, id).await
    }
    async fn update_profile_group(
        &self,
        id: &str,
        patch: &ProfileGroupPatch,
    ) -> Result<ProfileGroup, ApiError> {
        ApiClient::update_profile_group(self, id, patch).await
    }
    async fn add_profiles(
        &self,
        group_id: &str,
        profiles: Vec<NewProfile>,
    ) -> Result<Vec<Profile>, ApiError> {
        ApiClient::add_profiles(self, group_id, profiles)
            .await
            .map(|r| r.profiles)
    }
    async fn remove_profiles(
        &self,
        group_id: &str,
        profile_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        ApiClient::remove_profiles(self, group_id, profile_ids).await
    }
    async fn update_profile(
        &self,
        group_id: &str,
        profile_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile, ApiError> {
        ApiClient::update_profile(self, group_id, profile_id, patch).await
    }
    async fn import_profile_groups(&self, filepath: &str) -> Result<ImportResponse, ApiError> {
        ApiClient::import_profile_groups(self, filepath).await
    }
    async fn export_profile_groups(&self, filepath: &str) -> Result<(), ApiError> {
        ApiClient::export_profile_groups(self, filepath).await
    }
}

/// Emits lifecycle events around each remote call.
#[derive(Debug)]
pub struct Dispatcher<R> {
    remote: Arc<R>,
    tx: mpsc::UnboundedSender<Event>,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<R: Remote> Dispatcher<R> {
    pub fn new(remote: Arc<R>, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { remote, tx }
    }

    fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("store loop closed; event dropped");
        }
    }

    fn emit_tasks(&self, event: TasksEvent) {
        self.emit(Event::Tasks(event));
    }

    fn emit_profiles(&self, event: ProfilesEvent) {
        self.emit(Event::Profiles(event));
    }

    /// Fetches all releases, replacing the local collection on success.
    pub async fn load_releases(&self) -> Result<HashMap<String, Release>, ApiError> {
        self.emit_tasks(TasksEvent::LoadReleases(Lifecycle::Requested(())));
        match self.remote.list_releases().await {
            Ok(releases) => {
                self.emit_tasks(TasksEvent::LoadReleases(Lifecycle::Succeeded(
                    (),
                    releases.clone(),
                )));
                Ok(releases)
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::LoadReleases(Lifecycle::Failed(
                    (),
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn create_release(&self, name: &str, site: &str) -> Result<Release, ApiError> {
        let args = CreateReleaseRequest {
            name: name.to_string(),
            site: site.to_string(),
        };
        self.emit_tasks(TasksEvent::CreateRelease(Lifecycle::Requested(args.clone())));
        match self.remote.create_release(&args).await {
            Ok(release) => {
                self.emit_tasks(TasksEvent::CreateRelease(Lifecycle::Succeeded(
                    args,
                    release.clone(),
                )));
                Ok(release)
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::CreateRelease(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    /// Deletes a release. The local entity and its statuses are removed
    /// optimistically before the backend confirms.
    pub async fn delete_release(&self, id: &str) -> Result<(), ApiError> {
        let args = id.to_string();
        self.emit_tasks(TasksEvent::DeleteRelease(Lifecycle::Requested(args.clone())));
        match self.remote.delete_release(id).await {
            Ok(()) => {
                self.emit_tasks(TasksEvent::DeleteRelease(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::DeleteRelease(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    /// Partially updates a release: the patch merges optimistically, the
    /// server's returned entity replaces it on success.
    pub async fn update_release(&self, id: &str, patch: ReleasePatch) -> Result<Release, ApiError> {
        let args = UpdateReleaseArgs {
            id: id.to_string(),
            patch,
        };
        self.emit_tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(args.clone())));
        match self.remote.update_release(id, &args.patch).await {
            Ok(release) => {
                self.emit_tasks(TasksEvent::UpdateRelease(Lifecycle::Succeeded(
                    args,
                    release.clone(),
                )));
                Ok(release)
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::UpdateRelease(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn add_tasks(
        &self,
        release_id: &str,
        tasks: Vec<NewTask>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        let args = AddTasksArgs {
            release_id: release_id.to_string(),
            tasks,
        };
        self.emit_tasks(TasksEvent::AddTasks(Lifecycle::Requested(args.clone())));
        match self.remote.add_tasks(release_id, args.tasks.clone()).await {
            Ok(created) => {
                self.emit_tasks(TasksEvent::AddTasks(Lifecycle::Succeeded(
                    args,
                    created.clone(),
                )));
                Ok(created)
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::AddTasks(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn remove_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let args = RemoveTasksArgs {
            release_id: release_id.to_string(),
            task_ids,
        };
        self.emit_tasks(TasksEvent::RemoveTasks(Lifecycle::Requested(args.clone())));
        match self.remote.remove_tasks(release_id, args.task_ids.clone()).await {
            Ok(()) => {
                self.emit_tasks(TasksEvent::RemoveTasks(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::RemoveTasks(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    /// Batch task update from id/patch pairs; the wire call carries ids and
    /// patches positionally.
    pub async fn update_tasks(
        &self,
        release_id: &str,
        updates: Vec<TaskUpdate>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        let args = UpdateTasksArgs {
            release_id: release_id.to_string(),
            updates,
        };
        let task_ids: Vec<String> = args.updates.iter().map(|u| u.id.clone()).collect();
        let patches: Vec<TaskPatch> = args.updates.iter().map(|u| u.patch.clone()).collect();
        self.emit_tasks(TasksEvent::UpdateTasks(Lifecycle::Requested(args.clone())));
        match self.remote.update_tasks(release_id, task_ids, patches).await {
            Ok(updated) => {
                self.emit_tasks(TasksEvent::UpdateTasks(Lifecycle::Succeeded(
                    args,
                    updated.clone(),
                )));
                Ok(updated)
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::UpdateTasks(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn start_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let args = TaskSelectionArgs {
            release_id: release_id.to_string(),
            task_ids,
        };
        self.emit_tasks(TasksEvent::StartTasks(Lifecycle::Requested(args.clone())));
        match self.remote.start_tasks(release_id, args.task_ids.clone()).await {
            Ok(()) => {
                self.emit_tasks(TasksEvent::StartTasks(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::StartTasks(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn stop_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let args = TaskSelectionArgs {
            release_id: release_id.to_string(),
            task_ids,
        };
        self.emit_tasks(TasksEvent::StopTasks(Lifecycle::Requested(args.clone())));
        match self.remote.stop_tasks(release_id, args.task_ids.clone()).await {
            Ok(()) => {
                self.emit_tasks(TasksEvent::StopTasks(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_tasks(TasksEvent::StopTasks(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    /// Polls a task's log. Pass-through: log entries are not cached in the
    /// store.
    pub async fn poll_task_log(
        &self,
        release_id: &str,
        task_id: &str,
        after: Option<&str>,
    ) -> Result<TaskLogResponse, ApiError> {
        self.remote.poll_task_log(release_id, task_id, after).await
    }

    pub async fn load_profile_groups(&self) -> Result<HashMap<String, ProfileGroup>, ApiError> {
        self.emit_profiles(ProfilesEvent::LoadGroups(Lifecycle::Requested(())));
        match self.remote.list_profile_groups().await {
            Ok(groups) => {
                self.emit_profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
                    (),
                    groups.clone(),
                )));
                Ok(groups)
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::LoadGroups(Lifecycle::Failed(
                    (),
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn create_profile_group(&self, name: &str) -> Result<ProfileGroup, ApiError> {
        let args = CreateProfileGroupRequest {
            name: name.to_string(),
        };
        self.emit_profiles(ProfilesEvent::CreateGroup(Lifecycle::Requested(args.clone())));
        match self.remote.create_profile_group(&args).await {
            Ok(group) => {
                self.emit_profiles(ProfilesEvent::CreateGroup(Lifecycle::Succeeded(
                    args,
                    group.clone(),
                )));
                Ok(group)
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::CreateGroup(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn delete_profile_group(&self, id: &str) -> Result<(), ApiError> {
        let args = id.to_string();
        self.emit_profiles(ProfilesEvent::DeleteGroup(Lifecycle::Requested(args.clone())));
        match self.remote.delete_profile_group(id).await {
            Ok(()) => {
                self.emit_profiles(ProfilesEvent::DeleteGroup(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::DeleteGroup(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn update_profile_group(
        &self,
        id: &str,
        patch: ProfileGroupPatch,
    ) -> Result<ProfileGroup, ApiError> {
        let args = UpdateGroupArgs {
            id: id.to_string(),
            patch,
        };
        self.emit_profiles(ProfilesEvent::UpdateGroup(Lifecycle::Requested(args.clone())));
        match self.remote.update_profile_group(id, &args.patch).await {
            Ok(group) => {
                self.emit_profiles(ProfilesEvent::UpdateGroup(Lifecycle::Succeeded(
                    args,
                    group.clone(),
                )));
                Ok(group)
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::UpdateGroup(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn add_profiles(
        &self,
        group_id: &str,
        profiles: Vec<NewProfile>,
    ) -> Result<Vec<Profile>, ApiError> {
        let args = AddProfilesArgs {
            group_id: group_id.to_string(),
            profiles,
        };
        self.emit_profiles(ProfilesEvent::AddProfiles(Lifecycle::Requested(args.clone())));
        match self.remote.add_profiles(group_id, args.profiles.clone()).await {
            Ok(created) => {
                self.emit_profiles(ProfilesEvent::AddProfiles(Lifecycle::Succeeded(
                    args,
                    created.clone(),
                )));
                Ok(created)
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::AddProfiles(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn remove_profiles(
        &self,
        group_id: &str,
        profile_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        let args = RemoveProfilesArgs {
            group_id: group_id.to_string(),
            profile_ids,
        };
        self.emit_profiles(ProfilesEvent::RemoveProfiles(Lifecycle::Requested(args.clone())));
        match self
            .remote
            .remove_profiles(group_id, args.profile_ids.clone())
            .await
        {
            Ok(()) => {
                self.emit_profiles(ProfilesEvent::RemoveProfiles(Lifecycle::Succeeded(args, ())));
                Ok(())
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::RemoveProfiles(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    pub async fn update_profile(
        &self,
        group_id: &str,
        profile_id: &str,
        patch: ProfilePatch,
    ) -> Result<Profile, ApiError> {
        let args = UpdateProfileArgs {
            group_id: group_id.to_string(),
            profile_id: profile_id.to_string(),
            patch,
        };
        self.emit_profiles(ProfilesEvent::UpdateProfile(Lifecycle::Requested(args.clone())));
        match self
            .remote
            .update_profile(group_id, profile_id, &args.patch)
            .await
        {
            Ok(profile) => {
                self.emit_profiles(ProfilesEvent::UpdateProfile(Lifecycle::Succeeded(
                    args,
                    profile.clone(),
                )));
                Ok(profile)
            }
            Err(err) => {
                self.emit_profiles(ProfilesEvent::UpdateProfile(Lifecycle::Failed(
                    args,
                    CallError::from(&err),
                )));
                Err(err)
            }
        }
    }

    /// Imports profile groups from a backend-readable file. Pass-through;
    /// callers typically reload groups afterwards.
    pub async fn import_profile_groups(&self, filepath: &str) -> Result<ImportResponse, ApiError> {
        self.remote.import_profile_groups(filepath).await
    }

    /// Exports profile groups to a backend-writable file. Pass-through.
    pub async fn export_profile_groups(&self, filepath: &str) -> Result<(), ApiError> {
        self.remote.export_profile_groups(filepath).await
    }
}
