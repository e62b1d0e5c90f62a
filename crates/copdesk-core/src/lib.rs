#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models for the copdesk client: releases, tasks, task statuses,
//! profile groups, and the request/response types of the backend API.

pub mod api;
pub mod log;
pub mod model;
pub mod profile;
pub mod status;

pub use model::{Release, StatusUpdate, Task, TaskDefinition, TaskProfileRef};
pub use profile::{Profile, ProfileGroup, StreetAddress};
pub use status::{ExecutionClass, StatusKind, TaskStatus};
