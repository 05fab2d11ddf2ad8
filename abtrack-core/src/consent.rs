//! Do-Not-Track consent gate
//!
//! Checked before the agent touches cookies, storage or the network. A page
//! load that fails this check does nothing at all.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// User agent fragments that identify crawlers and link previewers
const BOT_PATTERNS: &[&str] = &[
    r"(?i)bot\b",
    r"(?i)crawl",
    r"(?i)spider",
    r"(?i)slurp",
    r"(?i)headlesschrome",
    r"(?i)facebookexternalhit",
    r"(?i)mediapartners-google",
    r"(?i)bingpreview",
];

fn bot_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BOT_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Tracking-preference signals exposed by the visitor's browser.
///
/// Every field is optional; a browser that exposes none of them is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentSignals {
    /// `window.doNotTrack`
    pub window_do_not_track: Option<String>,
    /// `navigator.doNotTrack`
    pub navigator_do_not_track: Option<String>,
    /// `navigator.msDoNotTrack`
    pub ms_do_not_track: Option<String>,
    /// Result of `window.external.msTrackingProtectionEnabled()`
    pub ms_tracking_protection_enabled: Option<bool>,
    /// `DNT` request header
    pub dnt_header: Option<String>,
    pub user_agent: Option<String>,
}

impl ConsentSignals {
    /// Signals of a browser with Do-Not-Track switched on.
    pub fn do_not_track() -> Self {
        Self {
            navigator_do_not_track: Some("1".to_string()),
            ..Self::default()
        }
    }

    /// Whether this visitor may be tracked.
    pub fn should_track(&self) -> bool {
        let refused = [
            &self.window_do_not_track,
            &self.navigator_do_not_track,
            &self.ms_do_not_track,
            &self.dnt_header,
        ]
        .into_iter()
        .flatten()
        .any(|value| is_refusal(value));

        if refused || self.ms_tracking_protection_enabled == Some(true) {
            return false;
        }

        !self.user_agent.as_deref().is_some_and(is_bot)
    }
}

fn is_refusal(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "yes")
}

/// Whether a user agent string belongs to a crawler.
pub fn is_bot(user_agent: &str) -> bool {
    bot_patterns().iter().any(|re| re.is_match(user_agent))
}
