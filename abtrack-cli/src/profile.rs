//! Simulated browser profile
//!
//! A directory holding the visitor's cookie jar and goal ledger, so several
//! `abtrack` invocations behave like successive page loads in one browser.

use std::path::PathBuf;
use std::sync::Arc;

use abtrack_core::{
    ClientStores, ConsentSignals, CookieAssignmentStore, FileLedgerStore, HttpTransport,
    PendingGoals,
};
use anyhow::{Context, Result};
use url::Url;

use crate::config::AbtrackConfig;

pub struct Profile {
    pub dir: PathBuf,
    pub assignments: Arc<CookieAssignmentStore>,
    pub ledger: Arc<FileLedgerStore>,
}

impl Profile {
    /// Open the profile named by `dir_override`, the config, or the default
    /// data directory, in that order.
    pub fn open(config: &AbtrackConfig, dir_override: Option<PathBuf>) -> Result<Self> {
        let dir = dir_override
            .or_else(|| config.profile.dir.clone())
            .unwrap_or_else(abtrack_paths::profile_dir);

        let assignments = CookieAssignmentStore::load(&dir)
            .with_context(|| format!("Failed to open cookie jar in {}", dir.display()))?
            .with_max_age(chrono::Duration::days(config.site.cookie_max_age_days));
        let ledger = FileLedgerStore::new(&dir);

        Ok(Self {
            dir,
            assignments: Arc::new(assignments),
            ledger: Arc::new(ledger),
        })
    }

    pub fn stores(&self) -> ClientStores {
        ClientStores::new(self.assignments.clone(), self.ledger.clone())
    }

    pub fn pending_goals(&self) -> PendingGoals {
        PendingGoals::new(self.ledger.clone())
    }
}

/// Consent signals for the configured visitor.
pub fn consent(config: &AbtrackConfig) -> ConsentSignals {
    ConsentSignals {
        navigator_do_not_track: config
            .profile
            .do_not_track
            .filter(|dnt| *dnt)
            .map(|_| "1".to_string()),
        user_agent: config.profile.user_agent.clone(),
        ..ConsentSignals::default()
    }
}

/// HTTP transport for the configured site.
pub fn transport(config: &AbtrackConfig) -> Result<HttpTransport> {
    let origin = Url::parse(&config.site.origin)
        .with_context(|| format!("Invalid site origin {:?}", config.site.origin))?;
    let timeout = config
        .site
        .request_timeout_secs
        .map(std::time::Duration::from_secs);

    Ok(HttpTransport::with_options(
        origin,
        config.profile.user_agent.as_deref(),
        timeout,
    )?)
}
