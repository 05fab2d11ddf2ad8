//! Client tracking agent
//!
//! One [`TrackingAgent`] lives for one page load. Starting it runs, in order:
//!
//! 1. the consent gate, which turns the whole agent into a no-op on refusal;
//! 2. the load-time `visit-page` event;
//! 3. participant registration, spawned in the background if the page is
//!    under test and the visitor has no assignment yet.
//!
//! The host page can then call [`TrackingAgent::trigger_event`] for its own
//! conversion events. Nothing the agent does can fail the page: every error
//! is logged and swallowed here.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::assignment::AssignmentStore;
use crate::consent::ConsentSignals;
use crate::descriptor::{TrackingParameters, VISIT_PAGE_EVENT};
use crate::ledger::{GoalLedgerStore, PendingGoals};
use crate::registrar::{ParticipantRegistrar, RegistrationOutcome};
use crate::reporter::{GoalReporter, TriggerOutcome};
use crate::transport::Transport;

/// Client-side state the agent reads and writes.
#[derive(Clone)]
pub struct ClientStores {
    pub assignments: Arc<dyn AssignmentStore>,
    pub ledger: Arc<dyn GoalLedgerStore>,
}

impl ClientStores {
    pub fn new(assignments: Arc<dyn AssignmentStore>, ledger: Arc<dyn GoalLedgerStore>) -> Self {
        Self {
            assignments,
            ledger,
        }
    }
}

struct ActiveAgent {
    reporter: GoalReporter,
    page_visit: Option<TriggerOutcome>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

/// Goal tracking for a single page load.
pub struct TrackingAgent {
    active: Option<ActiveAgent>,
}

impl TrackingAgent {
    /// Agent that ignores everything, for pages that must not be tracked.
    pub fn disabled() -> Self {
        Self { active: None }
    }

    /// Run the load-time steps for one page.
    ///
    /// `params` is `None` when the page carried no tracking parameters.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        params: Option<TrackingParameters>,
        consent: &ConsentSignals,
        stores: ClientStores,
        transport: Arc<dyn Transport>,
    ) -> Self {
        if !consent.should_track() {
            debug!("Tracking refused by visitor preferences");
            return Self::disabled();
        }

        let Some(params) = params else {
            debug!("No tracking parameters on page");
            return Self::disabled();
        };

        let tasks = TaskTracker::new();
        let cancel = CancellationToken::new();
        let pending = Arc::new(PendingGoals::new(stores.ledger));

        let reporter = GoalReporter::new(
            Arc::clone(&stores.assignments),
            Arc::clone(&pending),
            Arc::clone(&transport),
            params.urls.goal_reached.clone(),
            params.goal_scopes(),
            tasks.clone(),
            cancel.clone(),
        );

        let mut agent = Self {
            active: Some(ActiveAgent {
                reporter,
                page_visit: None,
                tasks,
                cancel,
            }),
        };

        // A registration confirmation cannot land before the page's own
        // visit-page check has run.
        let page_visit = agent.trigger_event(VISIT_PAGE_EVENT);
        if let Some(active) = agent.active.as_mut() {
            active.page_visit = page_visit;
        }

        let registrar = ParticipantRegistrar::new(
            stores.assignments,
            pending,
            transport,
            params.urls.register_participant.clone(),
        );
        agent.spawn_registration(&params, registrar);

        agent
    }

    /// Whether consent and page parameters allowed tracking.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// What the load-time `visit-page` event did.
    pub fn page_visit(&self) -> Option<&TriggerOutcome> {
        self.active.as_ref()?.page_visit.as_ref()
    }

    /// Report goals reached by `event` on this page.
    ///
    /// Returns `None` when the agent is disabled or the event could not be
    /// processed because client storage failed.
    pub fn trigger_event(&self, event: &str) -> Option<TriggerOutcome> {
        let active = self.active.as_ref()?;

        match active.reporter.trigger_event(event) {
            Ok(outcome) => {
                if !outcome.is_noop() {
                    debug!(
                        event,
                        reported = outcome.reported.len(),
                        skipped = outcome.skipped.len(),
                        "Goal event processed"
                    );
                }
                Some(outcome)
            }
            Err(e) => {
                warn!(event, error = %e, "Goal event dropped");
                None
            }
        }
    }

    /// Wait for every request in flight to finish.
    pub async fn settle(&self) {
        if let Some(active) = &self.active {
            active.tasks.close();
            active.tasks.wait().await;
            active.tasks.reopen();
        }
    }

    /// Navigate away: abandon whatever is still in flight.
    pub async fn unload(self) {
        if let Some(active) = self.active {
            active.cancel.cancel();
            active.tasks.close();
            active.tasks.wait().await;
        }
    }

    fn spawn_registration(&self, params: &TrackingParameters, registrar: ParticipantRegistrar) {
        let Some(active) = &self.active else {
            return;
        };
        let Some(test) = params.active_test() else {
            return;
        };

        match registrar.needs_registration(&test) {
            Ok(true) => {}
            Ok(false) => {
                debug!(test_id = %test.test_id, "Already a participant");
                return;
            }
            Err(e) => {
                warn!(test_id = %test.test_id, error = %e, "Could not read assignment");
                return;
            }
        }

        let cancel = active.cancel.clone();
        active.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(test_id = %test.test_id, "Registration abandoned on unload");
                }
                result = registrar.register(&test) => match result {
                    Ok(RegistrationOutcome::Confirmed) => {}
                    Ok(RegistrationOutcome::Rejected { status }) => {
                        debug!(test_id = %test.test_id, status, "Registration rejected");
                    }
                    Err(e) => {
                        warn!(test_id = %test.test_id, error = %e, "Registration failed");
                    }
                },
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::CookieAssignmentStore;
    use crate::descriptor::{Endpoints, TestId, Version};
    use crate::ledger::MemoryLedgerStore;
    use crate::transport::RecordingTransport;

    fn params() -> TrackingParameters {
        TrackingParameters {
            urls: Endpoints {
                register_participant: "/register/".to_string(),
                goal_reached: "/goal/".to_string(),
            },
            page_id: Some(42),
            test_id: Some(TestId::from("t1")),
            version: Some(Version::Variant),
            goal_event: Some("visit-page".to_string()),
            goal_page_id: Some(42),
        }
    }

    #[tokio::test]
    async fn disabled_agent_ignores_events() {
        let agent = TrackingAgent::disabled();
        assert!(!agent.is_active());
        assert!(agent.trigger_event("visit-page").is_none());
        agent.settle().await;
    }

    #[tokio::test]
    async fn missing_parameters_disable_agent() {
        let transport = Arc::new(RecordingTransport::new());
        let stores = ClientStores::new(
            Arc::new(CookieAssignmentStore::in_memory()),
            Arc::new(MemoryLedgerStore::new()),
        );

        let agent = TrackingAgent::start(None, &ConsentSignals::default(), stores, transport.clone());

        assert!(!agent.is_active());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn unload_abandons_pending_registration() {
        let transport = Arc::new(RecordingTransport::new());
        transport.hang("/register/");
        let assignments = Arc::new(CookieAssignmentStore::in_memory());
        let ledger = Arc::new(MemoryLedgerStore::new());
        let stores = ClientStores::new(assignments.clone(), ledger.clone());

        let agent = TrackingAgent::start(Some(params()), &ConsentSignals::default(), stores, transport.clone());
        tokio::task::yield_now().await;
        agent.unload().await;

        assert_eq!(transport.requests_to("/register/").len(), 1);
        assert_eq!(
            assignments.get_assigned_version(&TestId::from("t1")).unwrap(),
            None
        );
        assert!(ledger.raw().is_none());
    }

    #[tokio::test]
    async fn existing_participant_is_not_registered_again() {
        let transport = Arc::new(RecordingTransport::new());
        let assignments = Arc::new(CookieAssignmentStore::in_memory());
        assignments
            .set_assigned_version(&TestId::from("t1"), Version::Variant)
            .unwrap();
        let stores = ClientStores::new(assignments, Arc::new(MemoryLedgerStore::new()));

        let agent = TrackingAgent::start(Some(params()), &ConsentSignals::default(), stores, transport.clone());
        agent.settle().await;

        assert!(agent.is_active());
        assert_eq!(transport.request_count(), 0);
    }
}
