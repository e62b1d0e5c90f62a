#![forbid(unsafe_code)]

//! Client-side entity store for the copdesk backend.
//!
//! The store holds the local copy of releases, profile groups, and task
//! statuses. All mutation funnels through [`reduce`], driven by three-phase
//! lifecycle events ([`Lifecycle`]): optimistic transitions apply on
//! `Requested`, authoritative server payloads apply on `Succeeded`, and
//! `Failed` is logged without rollback. Reads are snapshot-based and
//! side-effect-free; derived views live in [`select`] behind explicit memo
//! cells keyed on per-facet revision counters.

pub mod dispatch;
pub mod event;
pub mod push;
pub mod reducer;
pub mod select;
pub mod state;
pub mod store;

pub use dispatch::{Dispatcher, Remote};
pub use event::{CallError, Event, Lifecycle, ProfilesEvent, TasksEvent};
pub use reducer::reduce;
pub use state::{AppState, ProfilesState, TasksState};
pub use store::{spawn, Store, StoreHandle};
