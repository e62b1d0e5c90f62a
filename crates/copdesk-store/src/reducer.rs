//! State transitions, one per event phase.
//!
//! Optimistic transitions (delete, remove, partial update) apply on
//! `Requested`; authoritative payloads replace entities on `Succeeded`.
//! Every existence check is a key-presence test: absent keys no-op, they
//! never raise. `Failed` phases are logged and leave the optimistic state in
//! place; a full reload re-synchronizes.

use tracing::warn;

use crate::event::{Event, Lifecycle, ProfilesEvent, TasksEvent};
use crate::state::AppState;

/// Applies one event to the state.
pub fn reduce(state: &mut AppState, event: Event) {
    match event {
        Event::Tasks(event) => reduce_tasks(state, event),
        Event::Profiles(event) => reduce_profiles(state, event),
    }
}

fn reduce_tasks(state: &mut AppState, event: TasksEvent) {
    let tasks = &mut state.tasks;
    match event {
        TasksEvent::LoadReleases(phase) => match phase {
            Lifecycle::Succeeded(_, releases) => {
                // Full replacement, not a merge: unconfirmed optimistic
                // entries are discarded if a reload races past them.
                tasks.loaded = true;
                tasks.releases = releases;
                tasks.releases_rev += 1;
            }
            Lifecycle::Failed(_, err) => warn!(op = "load_releases", %err, details = %err.details, "request failed"),
            Lifecycle::Requested(_) => {}
        },
        TasksEvent::CreateRelease(phase) => match phase {
            // No optimistic insert: there is no local entity until the
            // server assigns an id.
            Lifecycle::Succeeded(_, release) => {
                tasks.releases.insert(release.id.clone(), release);
                tasks.releases_rev += 1;
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "create_release", name = %args.name, %err, details = %err.details, "request failed");
            }
            Lifecycle::Requested(_) => {}
        },
        TasksEvent::DeleteRelease(phase) => match phase {
            // Optimistic: the release and its status sub-map go in the same
            // pass, before the server confirms.
            Lifecycle::Requested(id) => {
                if tasks.releases.remove(&id).is_some() {
                    tasks.releases_rev += 1;
                }
                if tasks.task_statuses.remove(&id).is_some() {
                    tasks.statuses_rev += 1;
                }
            }
            Lifecycle::Failed(id, err) => {
                warn!(op = "delete_release", release_id = %id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Succeeded(..) => {}
        },
        TasksEvent::UpdateRelease(phase) => match phase {
            Lifecycle::Requested(args) => {
                if let Some(release) = tasks.releases.get_mut(&args.id) {
                    args.patch.apply(release);
                    tasks.releases_rev += 1;
                }
            }
            Lifecycle::Succeeded(_, release) => {
                // Authoritative replacement, overwriting any optimistic drift.
                tasks.releases.insert(release.id.clone(), release);
                tasks.releases_rev += 1;
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "update_release", release_id = %args.id, %err, details = %err.details, "request failed");
            }
        },
        TasksEvent::AddTasks(phase) => match phase {
            Lifecycle::Succeeded(args, new_tasks) => {
                if let Some(release) = tasks.releases.get_mut(&args.release_id) {
                    for task in new_tasks {
                        release.tasks.insert(task.id.clone(), task);
                    }
                    tasks.releases_rev += 1;
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "add_tasks", release_id = %args.release_id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Requested(_) => {}
        },
        TasksEvent::RemoveTasks(phase) => match phase {
            Lifecycle::Requested(args) => {
                let mut touched = false;
                if let Some(release) = tasks.releases.get_mut(&args.release_id) {
                    for task_id in &args.task_ids {
                        touched |= release.tasks.remove(task_id).is_some();
                    }
                }
                if touched {
                    tasks.releases_rev += 1;
                }
                if let Some(statuses) = tasks.task_statuses.get_mut(&args.release_id) {
                    let mut cleared = false;
                    for task_id in &args.task_ids {
                        cleared |= statuses.remove(task_id).is_some();
                    }
                    if cleared {
                        tasks.statuses_rev += 1;
                    }
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "remove_tasks", release_id = %args.release_id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Succeeded(..) => {}
        },
        TasksEvent::UpdateTasks(phase) => match phase {
            Lifecycle::Requested(args) => {
                if let Some(release) = tasks.releases.get_mut(&args.release_id) {
                    let mut touched = false;
                    for update in &args.updates {
                        if let Some(task) = release.tasks.get_mut(&update.id) {
                            update.patch.apply(task);
                            touched = true;
                        }
                    }
                    if touched {
                        tasks.releases_rev += 1;
                    }
                }
            }
            Lifecycle::Succeeded(args, updated) => {
                if let Some(release) = tasks.releases.get_mut(&args.release_id) {
                    for task in updated {
                        release.tasks.insert(task.id.clone(), task);
                    }
                    tasks.releases_rev += 1;
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "update_tasks", release_id = %args.release_id, %err, details = %err.details, "request failed");
            }
        },
        // Start/stop never mutate the cache; execution state arrives only
        // through the push status feed, the backend stays sole authority.
        TasksEvent::StartTasks(phase) => {
            if let Lifecycle::Failed(args, err) = phase {
                warn!(op = "start_tasks", release_id = %args.release_id, %err, details = %err.details, "request failed");
            }
        }
        TasksEvent::StopTasks(phase) => {
            if let Lifecycle::Failed(args, err) = phase {
                warn!(op = "stop_tasks", release_id = %args.release_id, %err, details = %err.details, "request failed");
            }
        }
        TasksEvent::StatusBatch(batch) => {
            // Independent per-tuple application: tuples naming an unknown
            // release or task are dropped, the rest are written.
            let mut written = false;
            for update in batch {
                let known_task = tasks
                    .releases
                    .get(&update.release_id)
                    .is_some_and(|r| r.tasks.contains_key(&update.task_id));
                if !known_task {
                    continue;
                }
                tasks
                    .task_statuses
                    .entry(update.release_id)
                    .or_default()
                    .insert(update.task_id, update.status);
                written = true;
            }
            if written {
                tasks.statuses_rev += 1;
            }
        }
    }
}

fn reduce_profiles(state: &mut AppState, event: ProfilesEvent) {
    let profiles = &mut state.profiles;
    match event {
        ProfilesEvent::LoadGroups(phase) => match phase {
            Lifecycle::Succeeded(_, groups) => {
                profiles.loaded = true;
                profiles.groups = groups;
                profiles.groups_rev += 1;
            }
            Lifecycle::Failed(_, err) => warn!(op = "load_groups", %err, details = %err.details, "request failed"),
            Lifecycle::Requested(_) => {}
        },
        ProfilesEvent::CreateGroup(phase) => match phase {
            Lifecycle::Succeeded(_, group) => {
                profiles.groups.insert(group.id.clone(), group);
                profiles.groups_rev += 1;
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "create_group", name = %args.name, %err, details = %err.details, "request failed");
            }
            Lifecycle::Requested(_) => {}
        },
        ProfilesEvent::DeleteGroup(phase) => match phase {
            Lifecycle::Requested(id) => {
                if profiles.groups.remove(&id).is_some() {
                    profiles.groups_rev += 1;
                }
            }
            Lifecycle::Failed(id, err) => {
                warn!(op = "delete_group", group_id = %id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Succeeded(..) => {}
        },
        ProfilesEvent::UpdateGroup(phase) => match phase {
            Lifecycle::Requested(args) => {
                if let Some(group) = profiles.groups.get_mut(&args.id) {
                    args.patch.apply(group);
                    profiles.groups_rev += 1;
                }
            }
            Lifecycle::Succeeded(_, group) => {
                profiles.groups.insert(group.id.clone(), group);
                profiles.groups_rev += 1;
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "update_group", group_id = %args.id, %err, details = %err.details, "request failed");
            }
        },
        ProfilesEvent::AddProfiles(phase) => match phase {
            Lifecycle::Succeeded(args, new_profiles) => {
                if let Some(group) = profiles.groups.get_mut(&args.group_id) {
                    for profile in new_profiles {
                        group.profiles.insert(profile.id.clone(), profile);
                    }
                    profiles.groups_rev += 1;
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "add_profiles", group_id = %args.group_id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Requested(_) => {}
        },
        ProfilesEvent::RemoveProfiles(phase) => match phase {
            Lifecycle::Requested(args) => {
                if let Some(group) = profiles.groups.get_mut(&args.group_id) {
                    let mut touched = false;
                    for profile_id in &args.profile_ids {
                        touched |= group.profiles.remove(profile_id).is_some();
                    }
                    if touched {
                        profiles.groups_rev += 1;
                    }
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "remove_profiles", group_id = %args.group_id, %err, details = %err.details, "request failed");
            }
            Lifecycle::Succeeded(..) => {}
        },
        ProfilesEvent::UpdateProfile(phase) => match phase {
            Lifecycle::Requested(args) => {
                if let Some(group) = profiles.groups.get_mut(&args.group_id) {
                    if let Some(profile) = group.profiles.get_mut(&args.profile_id) {
                        args.patch.apply(profile);
                        profiles.groups_rev += 1;
                    }
                }
            }
            Lifecycle::Succeeded(args, profile) => {
                if let Some(group) = profiles.groups.get_mut(&args.group_id) {
                    group.profiles.insert(profile.id.clone(), profile);
                    profiles.groups_rev += 1;
                }
            }
            Lifecycle::Failed(args, err) => {
                warn!(op = "update_profile", group_id = %args.group_id, profile_id = %args.profile_id, %err, details = %err.details, "request failed");
            }
        },
    }
}
