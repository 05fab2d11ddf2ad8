//! abtrack-core: visitor-side participant registration and goal tracking
//! for CMS A/B tests
//!
//! The CMS renders a small set of tracking parameters into every page. This
//! crate implements what the visitor's side does with them:
//!
//! - **Consent** - [`ConsentSignals`] decides whether tracking may happen at all
//! - **Assignments** - [`AssignmentStore`] pins a visitor to a version via a
//!   per-test cookie ([`CookieAssignmentStore`])
//! - **Pending goals** - [`PendingGoals`] keeps goals owed a report in a single
//!   storage slot ([`GoalLedgerStore`])
//! - **Registration** - [`ParticipantRegistrar`] registers the visitor once and
//!   records the goal on confirmation
//! - **Reporting** - [`GoalReporter`] reports each reached goal at most once
//! - **Orchestration** - [`TrackingAgent`] runs all of the above for one page load
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use abtrack_core::{
//!     ClientStores, ConsentSignals, CookieAssignmentStore, MemoryLedgerStore,
//!     RecordingTransport, TrackingAgent, TrackingParameters,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = TrackingParameters::from_json(r#"{
//!     "urls": {"registerParticipant": "/abtesting/register-participant/",
//!              "goalReached": "/abtesting/goal-reached/"},
//!     "pageId": 3, "testId": 7, "version": "variant",
//!     "goalEvent": "visit-page", "goalPageId": 42
//! }"#)?;
//!
//! let stores = ClientStores::new(
//!     Arc::new(CookieAssignmentStore::in_memory()),
//!     Arc::new(MemoryLedgerStore::new()),
//! );
//! let agent = TrackingAgent::start(
//!     params,
//!     &ConsentSignals::default(),
//!     stores,
//!     Arc::new(RecordingTransport::new()),
//! );
//!
//! agent.trigger_event("newsletter-signup");
//! agent.settle().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod assignment;
pub mod consent;
pub mod descriptor;
pub mod error;
pub mod ledger;
pub mod registrar;
pub mod reporter;
pub mod transport;

// Re-export key types for convenience
pub use agent::{ClientStores, TrackingAgent};
pub use assignment::{AssignmentStore, CookieAssignmentStore, CookieJar, cookie_name};
pub use consent::ConsentSignals;
pub use descriptor::{
    ActiveTest, Endpoints, GoalScope, TestId, TrackingParameters, VISIT_PAGE_EVENT, Version,
};
pub use error::{DescriptorError, StoreError, TrackerError, TransportError};
pub use ledger::{FileLedgerStore, GoalLedger, GoalLedgerStore, MemoryLedgerStore, PendingGoals};
pub use registrar::{ParticipantRegistrar, RegistrationOutcome};
pub use reporter::{GoalReporter, TriggerOutcome};
pub use transport::{
    HttpTransport, ParticipantPayload, RecordedRequest, RecordingTransport, Transport,
};
