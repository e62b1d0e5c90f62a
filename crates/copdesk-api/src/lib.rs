#![forbid(unsafe_code)]

//! HTTP client for the copdesk backend.
//!
//! Every backend response arrives wrapped in a discriminated envelope:
//! `{"type":"success","response":...}` or
//! `{"type":"error","message":...,"details":...}`. [`ApiClient`] unwraps the
//! envelope and surfaces the error variant as [`ApiError::Api`].

mod client;
mod error;

pub use client::ApiClient;
pub use error::{ApiError, Envelope};
