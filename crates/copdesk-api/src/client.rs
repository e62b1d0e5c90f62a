use std::collections::HashMap;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use copdesk_core::api::{
    AddProfilesRequest, AddProfilesResponse, AddTasksRequest, CreateProfileGroupRequest,
    CreateReleaseRequest, ExportRequest, ImportRequest, ImportResponse, NewProfile, NewTask,
    ProfileGroupPatch, ProfilePatch, ReleasePatch, RemoveProfilesRequest, RemoveTasksRequest,
    TaskBatchResponse, TaskLogResponse, TaskPatch, TaskSelection, UpdateTasksRequest,
};
use copdesk_core::model::Release;
use copdesk_core::profile::{Profile, ProfileGroup};

use crate::error::{ApiError, Envelope};

/// Client for the copdesk backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = req.send().await?.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        envelope.into_result()
    }

    /// Sends a request whose success payload is empty.
    async fn send_unit(&self, req: RequestBuilder) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self.send(req).await?;
        Ok(())
    }

    // Releases

    /// `GET /releases`
    pub async fn list_releases(&self) -> Result<HashMap<String, Release>, ApiError> {
        self.send(self.http.get(self.url("/releases"))).await
    }

    /// `POST /releases`
    pub async fn create_release(&self, req: &CreateReleaseRequest) -> Result<Release, ApiError> {
        self.send(self.http.post(self.url("/releases")).json(req)).await
    }

    /// `DELETE /releases/:id`
    pub async fn delete_release(&self, id: &str) -> Result<(), ApiError> {
        self.send_unit(self.http.delete(self.url(&format!("/releases/{id}")))).await
    }

    /// `PATCH /releases/:id`
    pub async fn update_release(&self, id: &str, patch: &ReleasePatch) -> Result<Release, ApiError> {
        self.send(self.http.patch(self.url(&format!("/releases/{id}"))).json(patch))
            .await
    }

    /// `POST /releases/:id/tasks/batch`
    pub async fn add_tasks(
        &self,
        release_id: &str,
        tasks: Vec<NewTask>,
    ) -> Result<TaskBatchResponse, ApiError> {
        let req = AddTasksRequest { tasks };
        self.send(
            self.http
                .post(self.url(&format!("/releases/{release_id}/tasks/batch")))
                .json(&req),
        )
        .await
    }

    /// `DELETE /releases/:id/tasks/batch`
    pub async fn remove_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let req = RemoveTasksRequest { task_ids };
        self.send_unit(
            self.http
                .delete(self.url(&format!("/releases/{release_id}/tasks/batch")))
                .json(&req),
        )
        .await
    }

    /// `PATCH /releases/:id/tasks/batch` — ids pair positionally with patches.
    pub async fn update_tasks(
        &self,
        release_id: &str,
        task_ids: Vec<String>,
        updates: Vec<TaskPatch>,
    ) -> Result<TaskBatchResponse, ApiError> {
        let req = UpdateTasksRequest { task_ids, updates };
        self.send(
            self.http
                .patch(self.url(&format!("/releases/{release_id}/tasks/batch")))
                .json(&req),
        )
        .await
    }

    /// `POST /releases/:id/tasks/start`
    pub async fn start_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let req = TaskSelection { task_ids };
        self.send_unit(
            self.http
                .post(self.url(&format!("/releases/{release_id}/tasks/start")))
                .json(&req),
        )
        .await
    }

    /// `POST /releases/:id/tasks/stop`
    pub async fn stop_tasks(&self, release_id: &str, task_ids: Vec<String>) -> Result<(), ApiError> {
        let req = TaskSelection { task_ids };
        self.send_unit(
            self.http
                .post(self.url(&format!("/releases/{release_id}/tasks/stop")))
                .json(&req),
        )
        .await
    }

    /// `GET /releases/:id/tasks/:tid/log`
    pub async fn poll_task_log(
        &self,
        release_id: &str,
        task_id: &str,
        after: Option<&str>,
    ) -> Result<TaskLogResponse, ApiError> {
        let mut req = self
            .http
            .get(self.url(&format!("/releases/{release_id}/tasks/{task_id}/log")));
        if let Some(after) = after {
            req = req.query(&[("after", after)]);
        }
        self.send(req).await
    }

    // Profile groups

    /// `GET /profile_groups`
    pub async fn list_profile_groups(&self) -> Result<HashMap<String, ProfileGroup>, ApiError> {
        self.send(self.http.get(self.url("/profile_groups"))).await
    }

    /// `POST /profile_groups`
    pub async fn create_profile_group(
        &self,
        req: &CreateProfileGroupRequest,
    ) -> Result<ProfileGroup, ApiError> {
        self.send(self.http.post(self.url("/profile_groups")).json(req)).await
    }

    /// `DELETE /profile_groups/:id`
    pub async fn delete_profile_group(&self, id: &str) -> Result<(), ApiError> {
        self.send_unit(self.http.delete(self.url(&format!("/profile_groups/{id}"))))
            .await
    }

    /// `PATCH /profile_groups/:id`
    pub async fn update_profile_group(
        &self,
        id: &str,
        patch: &ProfileGroupPatch,
    ) -> Result<ProfileGroup, ApiError> {
        self.send(
            self.http
                .patch(self.url(&format!("/profile_groups/{id}")))
                .json(patch),
        )
        .await
    }

    /// `POST /profile_groups/:id/profiles/batch`
    pub async fn add_profiles(
        &self,
        group_id: &str,
        profiles: Vec<NewProfile>,
    ) -> Result<AddProfilesResponse, ApiError> {
        let req = AddProfilesRequest { profiles };
        self.send(
            self.http
                .post(self.url(&format!("/profile_groups/{group_id}/profiles/batch")))
                .json(&req),
        )
        .await
    }

    /// `DELETE /profile_groups/:id/profiles/batch`
    pub async fn remove_profiles(
        &self,
        group_id: &str,
        profile_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        let req = RemoveProfilesRequest { profile_ids };
        self.send_unit(
            self.http
                .delete(self.url(&format!("/profile_groups/{group_id}/profiles/batch")))
                .json(&req),
        )
        .await
    }

    /// `PATCH /profile_groups/:id/profiles/:pid`
    pub async fn update_profile(
        &self,
        group_id: &str,
        profile_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile, ApiError> {
        self.send(
            self.http
                .patch(self.url(&format!("/profile_groups/{group_id}/profiles/{profile_id}")))
                .json(patch),
        )
        .await
    }

    /// `POST /profile_groups/import`
    pub async fn import_profile_groups(&self, filepath: &str) -> Result<ImportResponse, ApiError> {
        let req = ImportRequest {
            filepath: filepath.to_string(),
        };
        self.send(self.http.post(self.url("/profile_groups/import")).json(&req))
            .await
    }

    /// `POST /profile_groups/export`
    pub async fn export_profile_groups(&self, filepath: &str) -> Result<(), ApiError> {
        let req = ExportRequest {
            filepath: filepath.to_string(),
        };
        self.send_unit(self.http.post(self.url("/profile_groups/export")).json(&req))
            .await
    }
}
