//! Participant registration
//!
//! A visitor becomes a participant only once the server has answered the
//! registration request with 200. Until then nothing is written; a failed or
//! abandoned registration simply happens again on the next page load because
//! no assignment cookie exists.

use std::sync::Arc;

use tracing::{debug, info};

use crate::assignment::AssignmentStore;
use crate::descriptor::ActiveTest;
use crate::error::TrackerError;
use crate::ledger::PendingGoals;
use crate::transport::{ParticipantPayload, Transport};

/// Status the registration endpoint answers with on success.
pub const REGISTRATION_CONFIRMED: u16 = 200;

/// How a registration attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Server confirmed; assignment pinned and goal recorded.
    Confirmed,
    /// Server answered with something other than 200; nothing recorded.
    Rejected { status: u16 },
}

/// Registers the visitor for the test served on the current page.
pub struct ParticipantRegistrar {
    assignments: Arc<dyn AssignmentStore>,
    pending: Arc<PendingGoals>,
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl ParticipantRegistrar {
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        pending: Arc<PendingGoals>,
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            assignments,
            pending,
            transport,
            endpoint: endpoint.into(),
        }
    }

    /// Whether this visitor still needs registering for `test`.
    pub fn needs_registration(&self, test: &ActiveTest) -> Result<bool, TrackerError> {
        Ok(self
            .assignments
            .get_assigned_version(&test.test_id)?
            .is_none())
    }

    /// Send the registration request and, on confirmation, pin the
    /// assignment and record the pending goal.
    ///
    /// Transport failures are returned as errors; nothing is persisted for
    /// them either.
    pub async fn register(&self, test: &ActiveTest) -> Result<RegistrationOutcome, TrackerError> {
        let payload = ParticipantPayload::new(test.test_id.clone(), test.version);
        debug!(test_id = %test.test_id, version = %test.version, "Registering participant");

        let status = self.transport.post_json(&self.endpoint, &payload).await?;
        if status != REGISTRATION_CONFIRMED {
            debug!(test_id = %test.test_id, status, "Registration not confirmed");
            return Ok(RegistrationOutcome::Rejected { status });
        }

        self.confirm(test)?;
        Ok(RegistrationOutcome::Confirmed)
    }

    fn confirm(&self, test: &ActiveTest) -> Result<(), TrackerError> {
        self.assignments
            .set_assigned_version(&test.test_id, test.version)?;
        self.pending
            .record(test.goal_scope, &test.goal_event, test.test_id.clone())?;

        info!(
            test_id = %test.test_id,
            version = %test.version,
            goal_scope = %test.goal_scope,
            goal_event = %test.goal_event,
            "Participant registered"
        );
        Ok(())
    }
}
