use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAbtrackConfig {
    #[serde(default)]
    pub site: RawSiteConfig,

    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Site config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSiteConfig {
    /// Origin that relative tracking endpoints resolve against
    pub origin: Option<String>,

    /// Per-request timeout applied by the HTTP client
    pub request_timeout_secs: Option<u64>,

    /// Lifetime of assignment cookies
    pub cookie_max_age_days: Option<i64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AbtrackConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin that relative tracking endpoints resolve against
    pub origin: String,

    /// Per-request timeout applied by the HTTP client (none when unset)
    pub request_timeout_secs: Option<u64>,

    /// Lifetime of assignment cookies
    pub cookie_max_age_days: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            request_timeout_secs: None,
            cookie_max_age_days: DEFAULT_COOKIE_MAX_AGE_DAYS,
        }
    }
}

/// The simulated visitor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileConfig {
    /// Directory holding the cookie jar and goal ledger
    pub dir: Option<PathBuf>,

    /// User agent sent with requests and checked by the consent gate
    pub user_agent: Option<String>,

    /// Browser Do-Not-Track preference
    pub do_not_track: Option<bool>,
}

/// Default site origin (local CMS development server)
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Default assignment cookie lifetime
pub const DEFAULT_COOKIE_MAX_AGE_DAYS: i64 = 365;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AbtrackConfig::default();
        assert_eq!(config.site.origin, DEFAULT_ORIGIN);
        assert_eq!(config.site.cookie_max_age_days, 365);
        assert!(config.site.request_timeout_secs.is_none());
        assert!(config.profile.dir.is_none());
        assert!(config.profile.do_not_track.is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AbtrackConfig {
            site: SiteConfig {
                origin: "https://www.example.com".to_string(),
                request_timeout_secs: Some(10),
                cookie_max_age_days: 30,
            },
            profile: ProfileConfig {
                dir: Some(PathBuf::from("/tmp/profile")),
                user_agent: Some("Mozilla/5.0".to_string()),
                do_not_track: Some(true),
            },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AbtrackConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.site.origin, "https://www.example.com");
        assert_eq!(parsed.site.request_timeout_secs, Some(10));
        assert_eq!(parsed.profile.dir, Some(PathBuf::from("/tmp/profile")));
        assert_eq!(parsed.profile.do_not_track, Some(true));
    }

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[site]
origin = "https://staging.example.com"
"#;
        let raw: RawAbtrackConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(
            raw.site.origin.as_deref(),
            Some("https://staging.example.com")
        );
        assert!(raw.site.cookie_max_age_days.is_none());
        assert!(raw.profile.user_agent.is_none());
    }

    #[test]
    fn test_raw_config_empty_uses_none() {
        let raw: RawAbtrackConfig = toml::from_str("").unwrap();
        assert!(raw.site.origin.is_none());
        assert!(raw.site.request_timeout_secs.is_none());
    }
}
