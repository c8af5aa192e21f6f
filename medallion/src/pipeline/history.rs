//! Bounded in-memory execution history.

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use super::ExecutionState;

/// Default number of executions retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct Entries {
    states: HashMap<String, ExecutionState>,
    order: VecDeque<String>,
}

/// Recent execution states keyed by run id.
///
/// Holds at most `capacity` entries; recording a new run beyond that evicts
/// the oldest inserted one. Re-recording a known run id updates it in place.
#[derive(Debug)]
pub struct ExecutionHistory {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ExecutionHistory {
    /// Creates a history retaining at most `capacity` runs (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Inserts or replaces a state.
    pub fn record(&self, state: &ExecutionState) {
        let mut entries = self.entries.write();
        if entries
            .states
            .insert(state.run_id.clone(), state.clone())
            .is_none()
        {
            entries.order.push_back(state.run_id.clone());
            while entries.order.len() > self.capacity {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.states.remove(&oldest);
                }
            }
        }
    }

    /// Looks up a run.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<ExecutionState> {
        self.entries.read().states.get(run_id).cloned()
    }

    /// Returns up to `limit` states, most recently started first.
    ///
    /// Runs that never started sort last.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<ExecutionState> {
        let entries = self.entries.read();
        let mut states: Vec<ExecutionState> = entries
            .order
            .iter()
            .filter_map(|id| entries.states.get(id).cloned())
            .collect();
        drop(entries);

        states.sort_by(|a, b| match (a.started_at, b.started_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        states.truncate(limit);
        states
    }

    /// Number of retained runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineLayer, PipelineStatus};
    use crate::utils::now_utc;
    use chrono::Duration;

    fn state(id: &str) -> ExecutionState {
        ExecutionState::new(id, "geo", PipelineLayer::Bronze)
    }

    #[test]
    fn test_oldest_is_evicted() {
        let history = ExecutionHistory::new(2);
        for id in ["a", "b", "c"] {
            history.record(&state(id));
        }

        assert_eq!(history.len(), 2);
        assert!(history.get("a").is_none());
        assert!(history.get("c").is_some());
    }

    #[test]
    fn test_rerecord_updates_in_place() {
        let history = ExecutionHistory::new(2);
        history.record(&state("a"));
        history.record(&state("b"));

        let mut updated = state("a");
        updated.status = PipelineStatus::Success;
        history.record(&updated);

        assert_eq!(history.len(), 2);
        assert_eq!(history.get("a").unwrap().status, PipelineStatus::Success);
    }

    #[test]
    fn test_recent_orders_by_start_with_unstarted_last() {
        let history = ExecutionHistory::default();
        let now = now_utc();

        let never = state("never");
        let mut old = state("old");
        old.started_at = Some(now);
        let mut new = state("new");
        new.started_at = Some(now + Duration::seconds(1));

        for s in [&never, &old, &new] {
            history.record(s);
        }

        let ids: Vec<String> = history.recent(10).into_iter().map(|s| s.run_id).collect();
        assert_eq!(ids, vec!["new", "old", "never"]);
        assert_eq!(history.recent(1).len(), 1);
    }
}
