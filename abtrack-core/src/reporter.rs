//! Goal reporting
//!
//! When an event fires, every test waiting on that event in one of the
//! current page's goal scopes gets a goal report, and the ledger entry is
//! retired. Reporting is at most once per browser-storage lifetime: the
//! entry is gone whether or not the report reaches the server.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::assignment::AssignmentStore;
use crate::descriptor::{GoalScope, TestId, Version};
use crate::error::TrackerError;
use crate::ledger::PendingGoals;
use crate::transport::{ParticipantPayload, Transport};

/// What one `trigger_event` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Goal reports sent, in dispatch order.
    pub reported: Vec<(TestId, Version)>,
    /// Ledger test ids without a readable assignment cookie; cleared unreported.
    pub skipped: Vec<TestId>,
    /// Scopes whose entry for the event was retired.
    pub cleared: Vec<GoalScope>,
}

impl TriggerOutcome {
    pub fn is_noop(&self) -> bool {
        self.cleared.is_empty()
    }
}

/// Reports reached goals for one page load.
pub struct GoalReporter {
    assignments: Arc<dyn AssignmentStore>,
    pending: Arc<PendingGoals>,
    transport: Arc<dyn Transport>,
    endpoint: String,
    scopes: Vec<GoalScope>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl GoalReporter {
    /// `scopes` are the goal scopes the current page can satisfy.
    /// Reports are spawned on `tasks` and abandoned when `cancel` fires.
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        pending: Arc<PendingGoals>,
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        scopes: Vec<GoalScope>,
        tasks: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            assignments,
            pending,
            transport,
            endpoint: endpoint.into(),
            scopes,
            tasks,
            cancel,
        }
    }

    /// Report every goal `event` satisfies on this page.
    ///
    /// Must be called from within a Tokio runtime; reports are sent in the
    /// background and never awaited here.
    pub fn trigger_event(&self, event: &str) -> Result<TriggerOutcome, TrackerError> {
        let mut outcome = TriggerOutcome::default();

        if self.pending.snapshot()?.is_empty() {
            return Ok(outcome);
        }

        for &scope in &self.scopes {
            let Some(test_ids) = self.pending.take(scope, event)? else {
                continue;
            };

            // Entry already retired: a failed cookie read drops only that test.
            for test_id in test_ids {
                match self.assignments.get_assigned_version(&test_id) {
                    Ok(Some(version)) => {
                        self.dispatch(ParticipantPayload::new(test_id.clone(), version));
                        outcome.reported.push((test_id, version));
                    }
                    Ok(None) => {
                        debug!(test_id = %test_id, event, "No assignment for pending goal, dropping it");
                        outcome.skipped.push(test_id);
                    }
                    Err(e) => {
                        warn!(test_id = %test_id, event, error = %e, "Could not read assignment, dropping goal");
                        outcome.skipped.push(test_id);
                    }
                }
            }

            outcome.cleared.push(scope);
        }

        Ok(outcome)
    }

    fn dispatch(&self, payload: ParticipantPayload) {
        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let cancel = self.cancel.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(test_id = %payload.test_id, "Goal report abandoned on unload");
                }
                result = transport.post_json(&endpoint, &payload) => match result {
                    Ok(status) => {
                        debug!(test_id = %payload.test_id, version = %payload.version, status, "Goal reported");
                    }
                    Err(e) => {
                        warn!(test_id = %payload.test_id, error = %e, "Goal report failed");
                    }
                },
            }
        });
    }
}
