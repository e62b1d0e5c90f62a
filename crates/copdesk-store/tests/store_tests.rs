//! Integration tests for the store: reducer transitions, derived views, and
//! the dispatcher/forwarder wiring.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use copdesk_api::ApiError;
use copdesk_core::api::{
    CreateProfileGroupRequest, CreateReleaseRequest, ImportResponse, NewProfile, NewTask,
    ProfileGroupPatch, ProfilePatch, ReleasePatch, TaskLogResponse, TaskPatch,
};
use copdesk_core::model::{Release, StatusUpdate, TaskDefinition, TaskProfileRef};
use copdesk_core::profile::{BillingAddress, PaymentCard, Profile, ProfileGroup, ShippingAddress};
use copdesk_core::status::{StatusKind, TaskStatus};
use copdesk_store::dispatch::{Dispatcher, Remote};
use copdesk_store::event::{
    Event, Lifecycle, ProfilesEvent, TaskUpdate, TasksEvent, UpdateProfileArgs, UpdateReleaseArgs,
};
use copdesk_store::push::spawn_status_forwarder;
use copdesk_store::select::{group_profiles, release_tasks, ProfileSelectors, TaskSelectors};
use copdesk_store::state::AppState;
use copdesk_store::store::{spawn, Store, StoreHandle};
use copdesk_store::CallError;

// Builders

fn release(id: &str, name: &str, site: &str) -> Release {
    Release {
        id: id.into(),
        name: name.into(),
        site: site.into(),
        proxy_list: "default".into(),
        prev_number: 0,
        options: Default::default(),
        tasks: Default::default(),
        monitor_delay: 3000,
        error_delay: 1500,
    }
}

fn task(id: &str, number: u32) -> TaskDefinition {
    TaskDefinition {
        id: id.into(),
        number,
        sizes: vec!["10".into()],
        profile: TaskProfileRef {
            group_id: "g1".into(),
            id: "p1".into(),
        },
        options: Default::default(),
    }
}

fn status(kind: StatusKind) -> TaskStatus {
    TaskStatus {
        status: kind,
        data: serde_json::Value::Null,
    }
}

fn status_update(release_id: &str, task_id: &str, kind: StatusKind) -> StatusUpdate {
    StatusUpdate {
        release_id: release_id.into(),
        task_id: task_id.into(),
        status: status(kind),
    }
}

fn group(id: &str, name: &str) -> ProfileGroup {
    ProfileGroup {
        id: id.into(),
        name: name.into(),
        profiles: Default::default(),
    }
}

fn profile(id: &str, name: &str) -> Profile {
    Profile {
        id: id.into(),
        name: name.into(),
        shipping: ShippingAddress {
            name: name.into(),
            one: "1 Main St".into(),
            two: None,
            zip: "10001".into(),
            city: "New York".into(),
            state: "NY".into(),
            country: "US".into(),
            phone: "5550001111".into(),
            email: "a@example.com".into(),
            same_as_billing: false,
        },
        billing: BillingAddress {
            name: name.into(),
            one: "1 Main St".into(),
            two: None,
            zip: "10001".into(),
            city: "New York".into(),
            state: "NY".into(),
            country: "US".into(),
            phone: "5550001111".into(),
            email: "a@example.com".into(),
        },
        card: PaymentCard {
            card_name: name.into(),
            number: "4242424242424242".into(),
            month: "01".into(),
            year: "2030".into(),
            cvv: "000".into(),
        },
    }
}

fn loaded_store(releases: Vec<Release>) -> Store {
    let mut store = Store::new();
    let map: HashMap<String, Release> = releases.into_iter().map(|r| (r.id.clone(), r)).collect();
    store.apply(Event::Tasks(TasksEvent::LoadReleases(Lifecycle::Succeeded(
        (),
        map,
    ))));
    store
}

// Reducer transitions

#[test]
fn test_load_replaces_collection_and_sets_loaded() {
    let mut store = loaded_store(vec![release("r1", "Old", "x")]);
    assert!(store.state().tasks.loaded);

    // A reload discards anything the first load brought in.
    let map: HashMap<String, Release> =
        [("r2".to_string(), release("r2", "New", "y"))].into_iter().collect();
    store.apply(Event::Tasks(TasksEvent::LoadReleases(Lifecycle::Succeeded(
        (),
        map,
    ))));
    assert!(!store.state().tasks.releases.contains_key("r1"));
    assert!(store.state().tasks.releases.contains_key("r2"));
}

#[test]
fn test_delete_release_cascades_statuses_in_one_transition() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    let mut store = loaded_store(vec![r1]);
    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![status_update(
        "r1",
        "t1",
        StatusKind::Running,
    )])));
    assert!(store.state().tasks.task_statuses.contains_key("r1"));

    store.apply(Event::Tasks(TasksEvent::DeleteRelease(Lifecycle::Requested(
        "r1".into(),
    ))));
    assert!(!store.state().tasks.releases.contains_key("r1"));
    assert!(!store.state().tasks.task_statuses.contains_key("r1"));

    // Late status updates for the deleted release are dropped.
    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![status_update(
        "r1",
        "t1",
        StatusKind::Finished,
    )])));
    assert!(store.state().tasks.task_statuses.is_empty());
}

#[test]
fn test_pending_update_on_missing_release_is_noop() {
    let mut store = loaded_store(vec![]);
    let rev = store.state().tasks.releases_rev();
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "ghost".into(),
            patch: ReleasePatch {
                name: Some("x".into()),
                ..Default::default()
            },
        },
    ))));
    assert!(store.state().tasks.releases.is_empty());
    assert_eq!(store.state().tasks.releases_rev(), rev);
}

#[test]
fn test_pending_update_merges_only_present_fields() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: ReleasePatch {
                monitor_delay: Some(9000),
                ..Default::default()
            },
        },
    ))));
    let r1 = &store.state().tasks.releases["r1"];
    assert_eq!(r1.monitor_delay, 9000);
    assert_eq!(r1.name, "Dunk");
    assert_eq!(r1.error_delay, 1500);
}

#[test]
fn test_fulfilled_update_replaces_optimistic_state_entirely() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: ReleasePatch {
                name: Some("optimistic".into()),
                ..Default::default()
            },
        },
    ))));

    let server = release("r1", "Authoritative", "x");
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Succeeded(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: Default::default(),
        },
        server.clone(),
    ))));
    assert_eq!(store.state().tasks.releases["r1"], server);
}

#[test]
fn test_rapid_updates_layer_last_write_wins_per_field() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: ReleasePatch {
                name: Some("first".into()),
                monitor_delay: Some(100),
                ..Default::default()
            },
        },
    ))));
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: ReleasePatch {
                name: Some("second".into()),
                ..Default::default()
            },
        },
    ))));
    let r1 = &store.state().tasks.releases["r1"];
    assert_eq!(r1.name, "second");
    assert_eq!(r1.monitor_delay, 100);

    // Whichever call resolves last overwrites everything.
    let server = release("r1", "server", "x");
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Succeeded(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: Default::default(),
        },
        server.clone(),
    ))));
    assert_eq!(store.state().tasks.releases["r1"], server);
}

#[test]
fn test_delete_resolving_before_update_makes_update_noop() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::DeleteRelease(Lifecycle::Requested(
        "r1".into(),
    ))));
    // The concurrently dispatched update's optimistic phase arrives after.
    store.apply(Event::Tasks(TasksEvent::UpdateRelease(Lifecycle::Requested(
        UpdateReleaseArgs {
            id: "r1".into(),
            patch: ReleasePatch {
                name: Some("late".into()),
                ..Default::default()
            },
        },
    ))));
    assert!(store.state().tasks.releases.is_empty());
}

#[test]
fn test_add_tasks_fulfilled_guarded_by_release_existence() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::AddTasks(Lifecycle::Succeeded(
        copdesk_store::event::AddTasksArgs {
            release_id: "ghost".into(),
            tasks: vec![],
        },
        vec![task("t1", 1)],
    ))));
    assert!(store.state().tasks.releases["r1"].tasks.is_empty());

    store.apply(Event::Tasks(TasksEvent::AddTasks(Lifecycle::Succeeded(
        copdesk_store::event::AddTasksArgs {
            release_id: "r1".into(),
            tasks: vec![],
        },
        vec![task("t1", 1), task("t2", 2)],
    ))));
    assert_eq!(store.state().tasks.releases["r1"].tasks.len(), 2);
}

#[test]
fn test_remove_tasks_optimistically_clears_tasks_and_statuses() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    r1.tasks.insert("t2".into(), task("t2", 2));
    let mut store = loaded_store(vec![r1]);
    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![status_update(
        "r1",
        "t1",
        StatusKind::Running,
    )])));

    store.apply(Event::Tasks(TasksEvent::RemoveTasks(Lifecycle::Requested(
        copdesk_store::event::RemoveTasksArgs {
            release_id: "r1".into(),
            task_ids: vec!["t1".into()],
        },
    ))));
    let tasks = &store.state().tasks;
    assert!(!tasks.releases["r1"].tasks.contains_key("t1"));
    assert!(tasks.releases["r1"].tasks.contains_key("t2"));
    assert!(!tasks.task_statuses["r1"].contains_key("t1"));
}

#[test]
fn test_update_tasks_pending_merges_and_fulfilled_replaces() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    let mut store = loaded_store(vec![r1]);

    store.apply(Event::Tasks(TasksEvent::UpdateTasks(Lifecycle::Requested(
        copdesk_store::event::UpdateTasksArgs {
            release_id: "r1".into(),
            updates: vec![
                TaskUpdate {
                    id: "t1".into(),
                    patch: TaskPatch {
                        sizes: Some(vec!["8".into()]),
                        ..Default::default()
                    },
                },
                // Unknown task id inside a known release: skipped.
                TaskUpdate {
                    id: "ghost".into(),
                    patch: Default::default(),
                },
            ],
        },
    ))));
    assert_eq!(
        store.state().tasks.releases["r1"].tasks["t1"].sizes,
        vec!["8".to_string()]
    );

    let mut server_task = task("t1", 1);
    server_task.sizes = vec!["9".into()];
    store.apply(Event::Tasks(TasksEvent::UpdateTasks(Lifecycle::Succeeded(
        copdesk_store::event::UpdateTasksArgs {
            release_id: "r1".into(),
            updates: vec![],
        },
        vec![server_task.clone()],
    ))));
    assert_eq!(store.state().tasks.releases["r1"].tasks["t1"], server_task);
}

#[test]
fn test_status_batch_applies_known_tuples_and_drops_the_rest() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    let mut store = loaded_store(vec![r1]);

    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![
        status_update("r1", "t1", StatusKind::Running),
        status_update("r1", "unknown-task", StatusKind::Running),
        status_update("unknown-release", "t1", StatusKind::Running),
    ])));
    let statuses = &store.state().tasks.task_statuses;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses["r1"].len(), 1);
    assert_eq!(statuses["r1"]["t1"].status, StatusKind::Running);
}

#[test]
fn test_failed_phase_leaves_optimistic_state_in_place() {
    let mut store = loaded_store(vec![release("r1", "Dunk", "x")]);
    store.apply(Event::Tasks(TasksEvent::DeleteRelease(Lifecycle::Requested(
        "r1".into(),
    ))));
    store.apply(Event::Tasks(TasksEvent::DeleteRelease(Lifecycle::Failed(
        "r1".into(),
        CallError {
            message: "backend unavailable".into(),
            details: "connection refused".into(),
        },
    ))));
    // No rollback: the release stays deleted until the next full reload.
    assert!(store.state().tasks.releases.is_empty());
}

#[test]
fn test_create_release_fulfilled_inserts_by_server_id() {
    let mut store = loaded_store(vec![]);
    let req = CreateReleaseRequest {
        name: "Dunk".into(),
        site: "x".into(),
    };
    // No optimistic insert: the entity does not exist until the server
    // assigns an id.
    store.apply(Event::Tasks(TasksEvent::CreateRelease(Lifecycle::Requested(
        req.clone(),
    ))));
    assert!(store.state().tasks.releases.is_empty());

    store.apply(Event::Tasks(TasksEvent::CreateRelease(Lifecycle::Succeeded(
        req,
        release("srv-1", "Dunk", "x"),
    ))));
    assert!(store.state().tasks.releases.contains_key("srv-1"));
}

#[test]
fn test_create_group_fulfilled_inserts_by_server_id() {
    let mut store = Store::new();
    let req = CreateProfileGroupRequest { name: "Main".into() };
    store.apply(Event::Profiles(ProfilesEvent::CreateGroup(Lifecycle::Requested(
        req.clone(),
    ))));
    assert!(store.state().profiles.groups.is_empty());

    store.apply(Event::Profiles(ProfilesEvent::CreateGroup(Lifecycle::Succeeded(
        req,
        group("srv-g1", "Main"),
    ))));
    assert!(store.state().profiles.groups.contains_key("srv-g1"));
}

#[test]
fn test_group_update_pending_guarded_and_fulfilled_replaces() {
    let mut store = Store::new();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        [("g1".to_string(), group("g1", "Main"))].into_iter().collect(),
    ))));

    store.apply(Event::Profiles(ProfilesEvent::UpdateGroup(Lifecycle::Requested(
        copdesk_store::event::UpdateGroupArgs {
            id: "g1".into(),
            patch: ProfileGroupPatch {
                name: Some("Renamed".into()),
            },
        },
    ))));
    assert_eq!(store.state().profiles.groups["g1"].name, "Renamed");

    // Unknown group: no-op.
    let rev = store.state().profiles.groups_rev();
    store.apply(Event::Profiles(ProfilesEvent::UpdateGroup(Lifecycle::Requested(
        copdesk_store::event::UpdateGroupArgs {
            id: "ghost".into(),
            patch: Default::default(),
        },
    ))));
    assert_eq!(store.state().profiles.groups_rev(), rev);

    let server = group("g1", "Authoritative");
    store.apply(Event::Profiles(ProfilesEvent::UpdateGroup(Lifecycle::Succeeded(
        copdesk_store::event::UpdateGroupArgs {
            id: "g1".into(),
            patch: Default::default(),
        },
        server.clone(),
    ))));
    assert_eq!(store.state().profiles.groups["g1"], server);
}

#[test]
fn test_add_profiles_fulfilled_guarded_by_group_existence() {
    let mut store = Store::new();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        [("g1".to_string(), group("g1", "Main"))].into_iter().collect(),
    ))));

    store.apply(Event::Profiles(ProfilesEvent::AddProfiles(Lifecycle::Succeeded(
        copdesk_store::event::AddProfilesArgs {
            group_id: "ghost".into(),
            profiles: vec![],
        },
        vec![profile("p1", "Jo")],
    ))));
    assert!(store.state().profiles.groups["g1"].profiles.is_empty());

    store.apply(Event::Profiles(ProfilesEvent::AddProfiles(Lifecycle::Succeeded(
        copdesk_store::event::AddProfilesArgs {
            group_id: "g1".into(),
            profiles: vec![],
        },
        vec![profile("p1", "Jo"), profile("p2", "Sam")],
    ))));
    assert_eq!(store.state().profiles.groups["g1"].profiles.len(), 2);
}

#[test]
fn test_remove_profiles_optimistically_clears_present_ids() {
    let mut g1 = group("g1", "Main");
    g1.profiles.insert("p1".into(), profile("p1", "Jo"));
    g1.profiles.insert("p2".into(), profile("p2", "Sam"));
    let mut store = Store::new();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        [("g1".to_string(), g1)].into_iter().collect(),
    ))));

    store.apply(Event::Profiles(ProfilesEvent::RemoveProfiles(Lifecycle::Requested(
        copdesk_store::event::RemoveProfilesArgs {
            group_id: "g1".into(),
            profile_ids: vec!["p1".into(), "ghost".into()],
        },
    ))));
    let profiles = &store.state().profiles.groups["g1"].profiles;
    assert!(!profiles.contains_key("p1"));
    assert!(profiles.contains_key("p2"));
}

#[test]
fn test_delete_nonexistent_group_is_silent_noop() {
    let mut store = Store::new();
    let rev = store.state().profiles.groups_rev();
    store.apply(Event::Profiles(ProfilesEvent::DeleteGroup(Lifecycle::Requested(
        "g1".into(),
    ))));
    assert!(store.state().profiles.groups.is_empty());
    assert_eq!(store.state().profiles.groups_rev(), rev);
}

#[test]
fn test_profile_update_pending_guarded_and_fulfilled_replaces() {
    let mut g1 = group("g1", "Main");
    g1.profiles.insert("p1".into(), profile("p1", "Jo"));
    let mut store = Store::new();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        [("g1".to_string(), g1)].into_iter().collect(),
    ))));

    store.apply(Event::Profiles(ProfilesEvent::UpdateProfile(Lifecycle::Requested(
        UpdateProfileArgs {
            group_id: "g1".into(),
            profile_id: "p1".into(),
            patch: ProfilePatch {
                name: Some("Joan".into()),
                ..Default::default()
            },
        },
    ))));
    assert_eq!(store.state().profiles.groups["g1"].profiles["p1"].name, "Joan");

    // Unknown profile in a known group: no-op.
    store.apply(Event::Profiles(ProfilesEvent::UpdateProfile(Lifecycle::Requested(
        UpdateProfileArgs {
            group_id: "g1".into(),
            profile_id: "ghost".into(),
            patch: Default::default(),
        },
    ))));
    assert_eq!(store.state().profiles.groups["g1"].profiles.len(), 1);

    let server = profile("p1", "Server Jo");
    store.apply(Event::Profiles(ProfilesEvent::UpdateProfile(Lifecycle::Succeeded(
        UpdateProfileArgs {
            group_id: "g1".into(),
            profile_id: "p1".into(),
            patch: Default::default(),
        },
        server.clone(),
    ))));
    assert_eq!(store.state().profiles.groups["g1"].profiles["p1"], server);
}

// Selectors

#[test]
fn test_release_header_groups_partition_and_order() {
    let store = loaded_store(vec![
        release("a", "foot A", "X"),
        release("b", "bar B", "Y"),
        release("c", "car C", "X"),
    ]);
    let mut selectors = TaskSelectors::new();
    let groups = selectors.release_header_groups(store.state()).to_vec();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].site, "X");
    assert_eq!(groups[1].site, "Y");
    let x_ids: Vec<&str> = groups[0].items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(x_ids, vec!["a", "c"]);
    let y_ids: Vec<&str> = groups[1].items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(y_ids, vec!["b"]);

    let flattened = selectors.flattened_release_headers(store.state());
    let order: Vec<&str> = flattened.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(order, vec!["a", "c", "b"]);
}

#[test]
fn test_release_headers_sorted_case_insensitively() {
    let store = loaded_store(vec![
        release("1", "zeta", "s"),
        release("2", "Alpha", "s"),
        release("3", "alpha", "s"),
    ]);
    let mut selectors = TaskSelectors::new();
    let names: Vec<&str> = selectors
        .release_headers(store.state())
        .iter()
        .map(|h| h.name.as_str())
        .collect();
    // Case-insensitive order, ties broken by natural string order.
    assert_eq!(names, vec!["Alpha", "alpha", "zeta"]);
}

#[test]
fn test_group_headers_case_insensitive_and_stable() {
    let mut store = Store::new();
    let groups: HashMap<String, ProfileGroup> = [
        ("g1".to_string(), group("g1", "banana")),
        ("g2".to_string(), group("g2", "Banana")),
        ("g3".to_string(), group("g3", "apple")),
    ]
    .into_iter()
    .collect();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        groups,
    ))));

    let mut selectors = ProfileSelectors::new();
    let names: Vec<&str> = selectors
        .group_headers(store.state())
        .iter()
        .map(|h| h.name.as_str())
        .collect();
    assert_eq!(names, vec!["apple", "Banana", "banana"]);
}

#[test]
fn test_status_overview_buckets_exclude_ready() {
    let mut r1 = release("r1", "Dunk", "x");
    for (id, number) in [("t1", 1), ("t2", 2), ("t3", 3), ("t4", 4), ("t5", 5)] {
        r1.tasks.insert(id.into(), task(id, number));
    }
    let mut store = loaded_store(vec![r1]);
    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![
        status_update("r1", "t1", StatusKind::Finished),
        status_update("r1", "t2", StatusKind::Running),
        status_update("r1", "t3", StatusKind::WaitingForProxy),
        status_update("r1", "t4", StatusKind::Cancelled),
        // t5 never reports: Ready, in no bucket.
    ])));

    let mut selectors = TaskSelectors::new();
    let overview = selectors.release_status_overview(store.state(), "r1");
    assert_eq!(overview.finished, 1);
    assert_eq!(overview.running, 2);
    assert_eq!(overview.stopped, 1);

    let total = store.state().tasks.releases["r1"].tasks.len();
    let bucketed = overview.finished + overview.running + overview.stopped;
    assert!(bucketed <= total);
    assert_eq!(total - bucketed, 1);
}

#[test]
fn test_status_overview_for_unknown_release_is_empty() {
    let store = Store::new();
    let mut selectors = TaskSelectors::new();
    let overview = selectors.release_status_overview(store.state(), "ghost");
    assert_eq!(overview, Default::default());
}

#[test]
fn test_release_tasks_pairs_definitions_with_statuses() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    r1.tasks.insert("t2".into(), task("t2", 2));
    let mut store = loaded_store(vec![r1]);
    store.apply(Event::Tasks(TasksEvent::StatusBatch(vec![status_update(
        "r1",
        "t1",
        StatusKind::Running,
    )])));

    let mut tasks = release_tasks(store.state(), "r1");
    tasks.sort_by_key(|t| t.definition.number);
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status.as_ref().map(|s| s.status), Some(StatusKind::Running));
    assert!(tasks[1].status.is_none());

    assert!(release_tasks(store.state(), "ghost").is_empty());
}

#[test]
fn test_profile_count_per_group() {
    let mut g1 = group("g1", "Main");
    g1.profiles.insert("p1".into(), profile("p1", "Jo"));
    g1.profiles.insert("p2".into(), profile("p2", "Sam"));
    let mut store = Store::new();
    store.apply(Event::Profiles(ProfilesEvent::LoadGroups(Lifecycle::Succeeded(
        (),
        [("g1".to_string(), g1), ("g2".to_string(), group("g2", "Alt"))]
            .into_iter()
            .collect(),
    ))));

    let mut selectors = ProfileSelectors::new();
    assert_eq!(selectors.profile_count(store.state(), "g1"), 2);
    assert_eq!(selectors.profile_count(store.state(), "g2"), 0);
    assert_eq!(selectors.profile_count(store.state(), "ghost"), 0);

    assert_eq!(group_profiles(store.state(), "g1").len(), 2);
    assert!(group_profiles(store.state(), "ghost").is_empty());
}

// Dispatcher + store loop

struct FakeRemote {
    releases: HashMap<String, Release>,
    fail_delete: bool,
    delete_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeRemote {
    fn new() -> Self {
        Self {
            releases: HashMap::new(),
            fail_delete: false,
            delete_gate: Mutex::new(None),
        }
    }

    fn not_scripted() -> ApiError {
        ApiError::Api {
            message: "not scripted".into(),
            details: String::new(),
        }
    }
}

#[async_trait::async_trait]
impl Remote for FakeRemote {
    async fn list_releases(&self) -> Result<HashMap<String, Release>, ApiError> {
        Ok(self.releases.clone())
    }
    async fn create_release(&self, req: &CreateReleaseRequest) -> Result<Release, ApiError> {
        Ok(release("srv-1", &req.name, &req.site))
    }
    async fn delete_release(&self, _id: &str) -> Result<(), ApiError> {
        let gate = self.delete_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_delete {
            Err(ApiError::Api {
                message: "delete rejected".into(),
                details: "backend said no".into(),
            })
        } else {
            Ok(())
        }
    }
    async fn update_release(&self, _id: &str, _patch: &ReleasePatch) -> Result<Release, ApiError> {
        Err(Self::not_scripted())
    }
    async fn add_tasks(
        &self,
        _release_id: &str,
        _tasks: Vec<NewTask>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        Err(Self::not_scripted())
    }
    async fn remove_tasks(&self, _release_id: &str, _task_ids: Vec<String>) -> Result<(), ApiError> {
        Err(Self::not_scripted())
    }
    async fn update_tasks(
        &self,
        _release_id: &str,
        _task_ids: Vec<String>,
        _updates: Vec<TaskPatch>,
    ) -> Result<Vec<TaskDefinition>, ApiError> {
        Err(Self::not_scripted())
    }
    async fn start_tasks(&self, _release_id: &str, _task_ids: Vec<String>) -> Result<(), ApiError> {
        Ok(())
    }
    async fn stop_tasks(&self, _release_id: &str, _task_ids: Vec<String>) -> Result<(), ApiError> {
        Ok(())
    }
    async fn poll_task_log(
        &self,
        _release_id: &str,
        _task_id: &str,
        _after: Option<&str>,
    ) -> Result<TaskLogResponse, ApiError> {
        Ok(TaskLogResponse { entries: vec![] })
    }
    async fn list_profile_groups(&self) -> Result<HashMap<String, ProfileGroup>, ApiError> {
        Ok(HashMap::new())
    }
    async fn create_profile_group(
        &self,
        req: &CreateProfileGroupRequest,
    ) -> Result<ProfileGroup, ApiError> {
        Ok(group("srv-g1", &req.name))
    }
    async fn delete_profile_group(&self, _id: &str) -> Result<(), ApiError> {
        Ok(())
    }
    async fn update_profile_group(
        &self,
        _id: &str,
        _patch: &ProfileGroupPatch,
    ) -> Result<ProfileGroup, ApiError> {
        Err(Self::not_scripted())
    }
    async fn add_profiles(
        &self,
        _group_id: &str,
        _profiles: Vec<NewProfile>,
    ) -> Result<Vec<Profile>, ApiError> {
        Err(Self::not_scripted())
    }
    async fn remove_profiles(
        &self,
        _group_id: &str,
        _profile_ids: Vec<String>,
    ) -> Result<(), ApiError> {
        Err(Self::not_scripted())
    }
    async fn update_profile(
        &self,
        _group_id: &str,
        _profile_id: &str,
        _patch: &ProfilePatch,
    ) -> Result<Profile, ApiError> {
        Err(Self::not_scripted())
    }
    async fn import_profile_groups(&self, _filepath: &str) -> Result<ImportResponse, ApiError> {
        Ok(ImportResponse { imported: vec![] })
    }
    async fn export_profile_groups(&self, _filepath: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

async fn wait_for(handle: &mut StoreHandle, predicate: impl Fn(&AppState) -> bool) {
    let deadline = tokio::time::Duration::from_secs(2);
    tokio::time::timeout(deadline, async {
        loop {
            if predicate(&*handle.snapshot()) {
                return;
            }
            assert!(handle.changed().await, "store loop ended early");
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_handle_dispatch_feeds_reducer_loop() {
    let (mut handle, _join) = spawn();
    handle.dispatch(Event::Tasks(TasksEvent::LoadReleases(Lifecycle::Succeeded(
        (),
        [("r1".to_string(), release("r1", "Dunk", "x"))].into_iter().collect(),
    ))));
    wait_for(&mut handle, |s| s.tasks.loaded).await;
    assert!(handle.snapshot().tasks.releases.contains_key("r1"));
}

#[tokio::test]
async fn test_dispatcher_load_populates_store() {
    let mut remote = FakeRemote::new();
    remote.releases.insert("r1".into(), release("r1", "Dunk", "x"));
    let (mut handle, _join) = spawn();
    let dispatcher = Dispatcher::new(Arc::new(remote), handle.sender());

    let fetched = dispatcher.load_releases().await.unwrap();
    assert_eq!(fetched.len(), 1);
    wait_for(&mut handle, |s| s.tasks.loaded).await;
    assert!(handle.snapshot().tasks.releases.contains_key("r1"));
}

#[tokio::test]
async fn test_dispatcher_emits_optimistic_delete_before_resolution() {
    let mut remote = FakeRemote::new();
    remote.releases.insert("r1".into(), release("r1", "Dunk", "x"));
    let (gate_tx, gate_rx) = oneshot::channel();
    remote.delete_gate = Mutex::new(Some(gate_rx));
    let remote = Arc::new(remote);

    let (mut handle, _join) = spawn();
    let dispatcher = Dispatcher::new(remote.clone(), handle.sender());
    dispatcher.load_releases().await.unwrap();
    wait_for(&mut handle, |s| s.tasks.loaded).await;

    let delete = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.delete_release("r1").await })
    };

    // The optimistic removal lands while the remote call is still gated.
    wait_for(&mut handle, |s| !s.tasks.releases.contains_key("r1")).await;
    assert!(!delete.is_finished());

    gate_tx.send(()).unwrap();
    delete.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dispatcher_returns_error_and_state_stays_diverged() {
    let mut remote = FakeRemote::new();
    remote.releases.insert("r1".into(), release("r1", "Dunk", "x"));
    remote.fail_delete = true;

    let (mut handle, _join) = spawn();
    let dispatcher = Dispatcher::new(Arc::new(remote), handle.sender());
    dispatcher.load_releases().await.unwrap();
    wait_for(&mut handle, |s| s.tasks.loaded).await;

    let err = dispatcher.delete_release("r1").await.unwrap_err();
    match err {
        ApiError::Api { message, details } => {
            assert_eq!(message, "delete rejected");
            assert_eq!(details, "backend said no");
        }
        other => panic!("expected api error, got {other:?}"),
    }
    // No rollback on rejection.
    wait_for(&mut handle, |s| !s.tasks.releases.contains_key("r1")).await;
}

#[tokio::test]
async fn test_status_forwarder_feeds_store() {
    let mut r1 = release("r1", "Dunk", "x");
    r1.tasks.insert("t1".into(), task("t1", 1));
    let mut remote = FakeRemote::new();
    remote.releases.insert("r1".into(), r1);

    let (mut handle, _join) = spawn();
    let dispatcher = Dispatcher::new(Arc::new(remote), handle.sender());
    dispatcher.load_releases().await.unwrap();
    wait_for(&mut handle, |s| s.tasks.loaded).await;

    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let _forwarder = spawn_status_forwarder(feed_rx, handle.sender());
    feed_tx
        .send(vec![status_update("r1", "t1", StatusKind::Running)])
        .unwrap();

    wait_for(&mut handle, |s| {
        s.tasks
            .task_statuses
            .get("r1")
            .is_some_and(|m| m.contains_key("t1"))
    })
    .await;
}
