//! Derived read views over the store.
//!
//! Selectors never duplicate canonical state: each one recomputes its
//! projection when the relevant facet revision moves and otherwise returns
//! the cached value. Per-id views use a keyed cache so many sidebar rows can
//! each hold their own entry without thrashing one shared slot. Keyed caches
//! are unbounded; cardinality is the number of ids a user ever displays, and
//! a stale entry is overwritten on its next miss.

use std::collections::HashMap;

use copdesk_core::model::Task;
use copdesk_core::profile::Profile;
use copdesk_core::status::StatusKind;

use crate::state::AppState;

/// Single-value memo cell keyed on a facet revision.
#[derive(Debug, Default)]
struct Memo<T> {
    entry: Option<(u64, T)>,
}

impl<T> Memo<T> {
    fn get_or_compute(&mut self, rev: u64, compute: impl FnOnce() -> T) -> &T {
        let stale = !matches!(&self.entry, Some((cached, _)) if *cached == rev);
        if stale {
            self.entry = Some((rev, compute()));
        }
        &self.entry.as_ref().unwrap().1
    }
}

/// Per-key memo map keyed on (id, facet revision).
#[derive(Debug, Default)]
struct KeyedMemo<T> {
    entries: HashMap<String, (u64, T)>,
}

impl<T: Clone> KeyedMemo<T> {
    fn get_or_compute(&mut self, key: &str, rev: u64, compute: impl FnOnce() -> T) -> T {
        if let Some((cached, value)) = self.entries.get(key) {
            if *cached == rev {
                return value.clone();
            }
        }
        let value = compute();
        self.entries.insert(key.to_string(), (rev, value.clone()));
        value
    }
}

/// Name/id/site projection of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHeader {
    pub id: String,
    pub name: String,
    pub site: String,
}

/// A release header without its site, nested under a site group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHeaderItem {
    pub id: String,
    pub name: String,
}

/// Releases of one site, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHeaderGroup {
    pub site: String,
    pub items: Vec<ReleaseHeaderItem>,
}

/// Task status tallies for one release. Tasks with no status record (Ready)
/// appear in no bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatusOverview {
    pub finished: usize,
    pub running: usize,
    pub stopped: usize,
}

/// Name/id projection of a profile group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeader {
    pub id: String,
    pub name: String,
}

// Case-insensitive order with natural order as the tie-breaker, so equal
// names ("Banana"/"banana") stay adjacent and deterministic.
fn name_sort_key(s: &str) -> (String, String) {
    (s.to_lowercase(), s.to_string())
}

/// Memoized views over the releases/tasks slice.
#[derive(Debug, Default)]
pub struct TaskSelectors {
    headers: Memo<Vec<ReleaseHeader>>,
    groups: Memo<Vec<ReleaseHeaderGroup>>,
    flattened: Memo<Vec<ReleaseHeader>>,
    overviews: KeyedMemo<TaskStatusOverview>,
}

impl TaskSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// All release headers, sorted case-insensitively by name (ties broken
    /// by natural string order).
    pub fn release_headers(&mut self, state: &AppState) -> &[ReleaseHeader] {
        self.headers
            .get_or_compute(state.tasks.releases_rev(), || {
                let mut headers: Vec<ReleaseHeader> = state
                    .tasks
                    .releases
                    .values()
                    .map(|r| ReleaseHeader {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        site: r.site.clone(),
                    })
                    .collect();
                headers.sort_by_cached_key(|h| name_sort_key(&h.name));
                headers
            })
    }

    /// Release headers grouped by site: groups sorted case-insensitively by
    /// site name, items within a group by id ascending (ids serve as a
    /// creation-order proxy).
    pub fn release_header_groups(&mut self, state: &AppState) -> &[ReleaseHeaderGroup] {
        self.groups
            .get_or_compute(state.tasks.releases_rev(), || {
                let mut by_site: HashMap<&str, Vec<ReleaseHeaderItem>> = HashMap::new();
                for release in state.tasks.releases.values() {
                    by_site
                        .entry(release.site.as_str())
                        .or_default()
                        .push(ReleaseHeaderItem {
                            id: release.id.clone(),
                            name: release.name.clone(),
                        });
                }

                let mut groups: Vec<ReleaseHeaderGroup> = by_site
                    .into_iter()
                    .map(|(site, mut items)| {
                        items.sort_by(|a, b| a.id.cmp(&b.id));
                        ReleaseHeaderGroup {
                            site: site.to_string(),
                            items,
                        }
                    })
                    .collect();
                groups.sort_by_cached_key(|g| name_sort_key(&g.site));
                groups
            })
    }

    /// The grouped order flattened back to one sequence, used to pick a
    /// default selection.
    pub fn flattened_release_headers(&mut self, state: &AppState) -> &[ReleaseHeader] {
        let rev = state.tasks.releases_rev();
        // Compute groups first so both memo cells can be borrowed.
        let groups = self.release_header_groups(state).to_vec();
        self.flattened.get_or_compute(rev, || {
            groups
                .iter()
                .flat_map(|group| {
                    group.items.iter().map(|item| ReleaseHeader {
                        id: item.id.clone(),
                        name: item.name.clone(),
                        site: group.site.clone(),
                    })
                })
                .collect()
        })
    }

    /// Status tallies for one release, cached per release id.
    pub fn release_status_overview(&mut self, state: &AppState, id: &str) -> TaskStatusOverview {
        self.overviews
            .get_or_compute(id, state.tasks.statuses_rev(), || {
                let mut overview = TaskStatusOverview::default();
                if let Some(statuses) = state.tasks.task_statuses.get(id) {
                    for status in statuses.values() {
                        match status.status {
                            StatusKind::Finished => overview.finished += 1,
                            StatusKind::Running
                            | StatusKind::Waiting
                            | StatusKind::WaitingForProxy => overview.running += 1,
                            StatusKind::Failed | StatusKind::Cancelled => overview.stopped += 1,
                        }
                    }
                }
                overview
            })
    }
}

/// All tasks of one release paired with their statuses, in storage order.
/// Not memoized: callers are per-detail views, not per-row pills.
pub fn release_tasks(state: &AppState, id: &str) -> Vec<Task> {
    let Some(release) = state.tasks.releases.get(id) else {
        return Vec::new();
    };
    let statuses = state.tasks.task_statuses.get(id);
    release
        .tasks
        .values()
        .map(|definition| Task {
            definition: definition.clone(),
            status: statuses.and_then(|s| s.get(&definition.id)).cloned(),
        })
        .collect()
}

/// Memoized views over the profiles slice.
#[derive(Debug, Default)]
pub struct ProfileSelectors {
    headers: Memo<Vec<GroupHeader>>,
    counts: KeyedMemo<usize>,
}

impl ProfileSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// All group headers, sorted case-insensitively by name (ties broken by
    /// natural string order, so "Banana" and "banana" stay adjacent and
    /// deterministic).
    pub fn group_headers(&mut self, state: &AppState) -> &[GroupHeader] {
        self.headers
            .get_or_compute(state.profiles.groups_rev(), || {
                let mut headers: Vec<GroupHeader> = state
                    .profiles
                    .groups
                    .values()
                    .map(|g| GroupHeader {
                        id: g.id.clone(),
                        name: g.name.clone(),
                    })
                    .collect();
                headers.sort_by_cached_key(|h| name_sort_key(&h.name));
                headers
            })
    }

    /// Number of profiles in one group, cached per group id. Zero for an
    /// unknown group.
    pub fn profile_count(&mut self, state: &AppState, id: &str) -> usize {
        self.counts.get_or_compute(id, state.profiles.groups_rev(), || {
            state
                .profiles
                .groups
                .get(id)
                .map(|g| g.profiles.len())
                .unwrap_or(0)
        })
    }
}

/// All profiles of one group, in storage order.
pub fn group_profiles(state: &AppState, id: &str) -> Vec<Profile> {
    state
        .profiles
        .groups
        .get(id)
        .map(|g| g.profiles.values().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_recomputes_only_on_new_rev() {
        let mut memo: Memo<u32> = Memo::default();
        let mut calls = 0;
        let v = *memo.get_or_compute(1, || {
            calls += 1;
            10
        });
        assert_eq!((v, calls), (10, 1));
        let v = *memo.get_or_compute(1, || {
            calls += 1;
            11
        });
        assert_eq!((v, calls), (10, 1));
        let v = *memo.get_or_compute(2, || {
            calls += 1;
            12
        });
        assert_eq!((v, calls), (12, 2));
    }

    #[test]
    fn test_keyed_memo_holds_one_entry_per_key() {
        let mut memo: KeyedMemo<u32> = KeyedMemo::default();
        let mut calls = 0;
        // Alternating keys at the same revision must not evict each other.
        for _ in 0..3 {
            let a = memo.get_or_compute("a", 1, || {
                calls += 1;
                1
            });
            let b = memo.get_or_compute("b", 1, || {
                calls += 1;
                2
            });
            assert_eq!((a, b), (1, 2));
        }
        assert_eq!(calls, 2);
    }
}
