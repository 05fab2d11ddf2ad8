//! Tracking parameters rendered into the page by the CMS
//!
//! The server emits one JSON object per page load. It always carries the two
//! endpoint URLs, carries `pageId` when the page is a CMS page, and carries the
//! test fields (`testId`, `version`, `goalEvent`, `goalPageId`) only when the
//! page being served is under test.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DescriptorError;

/// Reserved event fired once on every page load.
pub const VISIT_PAGE_EVENT: &str = "visit-page";

/// Identifier of an A/B test.
///
/// The CMS renders test ids as JSON numbers; string ids are accepted as well
/// so that hand-written descriptors parse. Numeric ids serialize back as
/// numbers, which is what the tracking endpoints expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for TestId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for TestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_u64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for TestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self::from(n),
            RawId::Text(s) => Self(s),
        })
    }
}

/// Which rendering of the page a visitor was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    Control,
    Variant,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Control => "control",
            Version::Variant => "variant",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "control" => Ok(Version::Control),
            "variant" => Ok(Version::Variant),
            other => Err(DescriptorError::UnknownVersion(other.to_string())),
        }
    }
}

/// Where a goal must be reached: a specific page, or anywhere on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GoalScope {
    Page(u64),
    Global,
}

impl GoalScope {
    /// Canonical ledger key for goals not tied to a page.
    pub const GLOBAL_KEY: &'static str = "global";

    /// Key used in the persisted ledger.
    pub fn key(&self) -> String {
        match self {
            GoalScope::Page(id) => id.to_string(),
            GoalScope::Global => Self::GLOBAL_KEY.to_string(),
        }
    }

    /// Parse a ledger key, folding every historical "no page" spelling into
    /// [`GoalScope::Global`]. Returns `None` for keys that are neither.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "" | "global" | "null" | "None" | "undefined" | "0" => Some(GoalScope::Global),
            other => other.parse().ok().map(GoalScope::Page),
        }
    }
}

impl From<Option<u64>> for GoalScope {
    fn from(page_id: Option<u64>) -> Self {
        match page_id {
            Some(0) | None => GoalScope::Global,
            Some(id) => GoalScope::Page(id),
        }
    }
}

impl fmt::Display for GoalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Tracking endpoints, usually paths relative to the site origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub register_participant: String,
    pub goal_reached: String,
}

/// The per-page object produced by the CMS template tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingParameters {
    pub urls: Endpoints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<TestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_page_id: Option<u64>,
}

/// A test the current page is serving, with everything needed to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTest {
    pub test_id: TestId,
    pub version: Version,
    pub goal_event: String,
    pub goal_scope: GoalScope,
}

impl TrackingParameters {
    /// Parse the JSON rendered into the page.
    ///
    /// Accepts the bare parameters object, `null` (nothing to track), or the
    /// template-tag context form `{"track": bool, "tracking_parameters": ...}`.
    pub fn from_json(json: &str) -> Result<Option<Self>, DescriptorError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Option<Self>, DescriptorError> {
        let value = match value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Object(mut map) if map.contains_key("tracking_parameters") => {
                let track = map
                    .get("track")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(true);
                if !track {
                    return Ok(None);
                }
                match map.remove("tracking_parameters") {
                    Some(serde_json::Value::Null) | None => return Ok(None),
                    Some(inner) => inner,
                }
            }
            other => other,
        };

        Ok(Some(serde_json::from_value(value)?))
    }

    /// The test served on this page, if the page is under test.
    ///
    /// All of `testId`, `version` and `goalEvent` must be present.
    pub fn active_test(&self) -> Option<ActiveTest> {
        Some(ActiveTest {
            test_id: self.test_id.clone()?,
            version: self.version?,
            goal_event: self.goal_event.clone()?,
            goal_scope: GoalScope::from(self.goal_page_id),
        })
    }

    /// Ledger scopes checked whenever an event fires on this page.
    pub fn goal_scopes(&self) -> Vec<GoalScope> {
        match GoalScope::from(self.page_id) {
            GoalScope::Global => vec![GoalScope::Global],
            page => vec![page, GoalScope::Global],
        }
    }
}
