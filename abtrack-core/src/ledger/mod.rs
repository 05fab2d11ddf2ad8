//! Pending-goal ledger
//!
//! Goals a participant still owes a report for, persisted under a single
//! storage key as JSON:
//!
//! ```text
//! {
//!   "<goal page id or \"global\">": {
//!     "<goal event>": [<ids of tests with this goal page/event>]
//!   }
//! }
//! ```
//!
//! A test id is added only after the server confirms registration and is
//! removed, together with the rest of its (scope, event) entry, as soon as
//! the goal is reported. Removal rather than marking is what stops a goal
//! being reported twice.

mod store;

pub use store::{FileLedgerStore, GoalLedgerStore, LEDGER_STORAGE_KEY, MemoryLedgerStore};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use crate::descriptor::{GoalScope, TestId};
use crate::error::StoreError;

type RawLedger = BTreeMap<String, BTreeMap<String, Vec<TestId>>>;

/// In-memory form of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalLedger {
    entries: BTreeMap<GoalScope, BTreeMap<String, Vec<TestId>>>,
}

impl GoalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse persisted JSON. Absent, malformed or wrongly shaped data yields
    /// an empty ledger; keys that are not goal scopes are dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
            return Self::new();
        };

        let parsed: RawLedger = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Treating unreadable goal ledger as empty");
                return Self::new();
            }
        };

        let mut ledger = Self::new();
        for (key, events) in parsed {
            let Some(scope) = GoalScope::from_key(&key) else {
                debug!(key = %key, "Dropping ledger entry with unknown scope");
                continue;
            };
            for (event, test_ids) in events {
                for test_id in test_ids {
                    ledger.insert(scope, &event, test_id);
                }
            }
        }
        ledger
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|source| StoreError::Serialize {
            what: "goal ledger",
            source,
        })
    }

    /// Add `test_id` under (scope, event), creating levels as needed.
    /// Returns false if it was already there.
    pub fn insert(&mut self, scope: GoalScope, event: &str, test_id: TestId) -> bool {
        let test_ids = self
            .entries
            .entry(scope)
            .or_default()
            .entry(event.to_string())
            .or_default();

        if test_ids.contains(&test_id) {
            return false;
        }
        test_ids.push(test_id);
        true
    }

    /// Test ids waiting on (scope, event).
    pub fn get(&self, scope: GoalScope, event: &str) -> Option<&[TestId]> {
        self.entries
            .get(&scope)
            .and_then(|events| events.get(event))
            .map(Vec::as_slice)
    }

    /// Remove and return the (scope, event) entry. A scope left with no
    /// events is removed too.
    pub fn take(&mut self, scope: GoalScope, event: &str) -> Option<Vec<TestId>> {
        let events = self.entries.get_mut(&scope)?;
        let test_ids = events.remove(event)?;
        if events.is_empty() {
            self.entries.remove(&scope);
        }
        Some(test_ids)
    }

    pub fn contains(&self, scope: GoalScope, event: &str, test_id: &TestId) -> bool {
        self.get(scope, event)
            .is_some_and(|test_ids| test_ids.contains(test_id))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending (test, goal) pairs.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Every pending (scope, event, test id) triple.
    pub fn iter(&self) -> impl Iterator<Item = (GoalScope, &str, &TestId)> {
        self.entries.iter().flat_map(|(scope, events)| {
            events.iter().flat_map(move |(event, test_ids)| {
                test_ids.iter().map(move |id| (*scope, event.as_str(), id))
            })
        })
    }
}

impl Serialize for GoalLedger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: BTreeMap<String, &BTreeMap<String, Vec<TestId>>> = self
            .entries
            .iter()
            .map(|(scope, events)| (scope.key(), events))
            .collect();
        raw.serialize(serializer)
    }
}

/// Serialized access to a [`GoalLedgerStore`].
///
/// Every mutation is a read-modify-write done under one lock with no
/// suspension point inside, so a registration confirmation and a goal event
/// can never lose each other's update.
pub struct PendingGoals {
    store: Arc<dyn GoalLedgerStore>,
    guard: Mutex<()>,
}

impl PendingGoals {
    pub fn new(store: Arc<dyn GoalLedgerStore>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    /// Current persisted ledger.
    pub fn snapshot(&self) -> Result<GoalLedger, StoreError> {
        let raw = self.store.read()?;
        Ok(GoalLedger::parse(raw.as_deref()))
    }

    /// Record that `test_id` owes a report for (scope, event).
    pub fn record(&self, scope: GoalScope, event: &str, test_id: TestId) -> Result<(), StoreError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| StoreError::Poisoned("goal ledger"))?;

        let mut ledger = self.snapshot()?;
        if ledger.insert(scope, event, test_id) {
            self.store.write(&ledger.to_json()?)?;
        }
        Ok(())
    }

    /// Retire the (scope, event) entry, returning the test ids it held.
    ///
    /// Storage is only written when the entry existed.
    pub fn take(&self, scope: GoalScope, event: &str) -> Result<Option<Vec<TestId>>, StoreError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| StoreError::Poisoned("goal ledger"))?;

        let mut ledger = self.snapshot()?;
        let Some(test_ids) = ledger.take(scope, event) else {
            return Ok(None);
        };
        self.store.write(&ledger.to_json()?)?;
        Ok(Some(test_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_malformed_is_empty() {
        assert!(GoalLedger::parse(None).is_empty());
        assert!(GoalLedger::parse(Some("")).is_empty());
        assert!(GoalLedger::parse(Some("{not json")).is_empty());
        assert!(GoalLedger::parse(Some("[1, 2, 3]")).is_empty());
        assert!(GoalLedger::parse(Some(r#"{"42": {"visit-page": "t1"}}"#)).is_empty());
    }

    #[test]
    fn insert_creates_levels_and_keeps_order() {
        let mut ledger = GoalLedger::new();
        assert!(ledger.insert(GoalScope::Page(42), "visit-page", TestId::from("b")));
        assert!(ledger.insert(GoalScope::Page(42), "visit-page", TestId::from("a")));
        assert!(!ledger.insert(GoalScope::Page(42), "visit-page", TestId::from("b")));

        assert_eq!(
            ledger.get(GoalScope::Page(42), "visit-page").unwrap(),
            &[TestId::from("b"), TestId::from("a")]
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn serializes_with_string_scope_keys() {
        let mut ledger = GoalLedger::new();
        ledger.insert(GoalScope::Page(42), "visit-page", TestId::from("t1"));
        ledger.insert(GoalScope::Global, "signup", TestId::from(7));

        assert_eq!(
            ledger.to_json().unwrap(),
            r#"{"42":{"visit-page":["t1"]},"global":{"signup":[7]}}"#
        );
    }

    #[test]
    fn take_prunes_empty_scopes() {
        let mut ledger = GoalLedger::new();
        ledger.insert(GoalScope::Page(42), "visit-page", TestId::from("t1"));
        ledger.insert(GoalScope::Page(42), "signup", TestId::from("t2"));

        assert_eq!(
            ledger.take(GoalScope::Page(42), "visit-page"),
            Some(vec![TestId::from("t1")])
        );
        assert!(!ledger.is_empty());
        assert_eq!(ledger.take(GoalScope::Page(42), "visit-page"), None);

        ledger.take(GoalScope::Page(42), "signup");
        assert!(ledger.is_empty());
        assert_eq!(ledger.to_json().unwrap(), "{}");
    }

    #[test]
    fn legacy_null_keys_merge_into_global() {
        let ledger = GoalLedger::parse(Some(
            r#"{"null": {"signup": [1]}, "global": {"signup": [1, 2]}, "about": {"x": [3]}}"#,
        ));

        assert_eq!(
            ledger.get(GoalScope::Global, "signup").unwrap(),
            &[TestId::from(1), TestId::from(2)]
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn pending_goals_round_trip_through_store() {
        let store = Arc::new(MemoryLedgerStore::new());
        let pending = PendingGoals::new(store.clone());

        pending
            .record(GoalScope::Page(42), "visit-page", TestId::from("t1"))
            .unwrap();
        assert_eq!(
            store.raw().as_deref(),
            Some(r#"{"42":{"visit-page":["t1"]}}"#)
        );

        let taken = pending.take(GoalScope::Page(42), "visit-page").unwrap();
        assert_eq!(taken, Some(vec![TestId::from("t1")]));
        assert_eq!(store.raw().as_deref(), Some("{}"));
    }

    #[test]
    fn take_of_missing_entry_does_not_write() {
        let store = Arc::new(MemoryLedgerStore::new());
        let pending = PendingGoals::new(store.clone());

        assert_eq!(pending.take(GoalScope::Global, "visit-page").unwrap(), None);
        assert_eq!(store.write_count(), 0);
        assert!(store.raw().is_none());
    }
}
