use super::types::{
    AbtrackConfig, DEFAULT_COOKIE_MAX_AGE_DAYS, DEFAULT_ORIGIN, ProfileConfig, RawAbtrackConfig,
    RawSiteConfig, SiteConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<AbtrackConfig> {
        let mut raw = RawAbtrackConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/abtrack/config.toml`)
    pub fn user_config_path() -> PathBuf {
        abtrack_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ABTRACK_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ABTRACK_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".abtrack/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawAbtrackConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawAbtrackConfig, overlay: RawAbtrackConfig) -> RawAbtrackConfig {
        RawAbtrackConfig {
            site: RawSiteConfig {
                origin: overlay.site.origin.or(base.site.origin),
                request_timeout_secs: overlay
                    .site
                    .request_timeout_secs
                    .or(base.site.request_timeout_secs),
                cookie_max_age_days: overlay
                    .site
                    .cookie_max_age_days
                    .or(base.site.cookie_max_age_days),
            },
            profile: ProfileConfig {
                dir: overlay.profile.dir.or(base.profile.dir),
                user_agent: overlay.profile.user_agent.or(base.profile.user_agent),
                do_not_track: overlay.profile.do_not_track.or(base.profile.do_not_track),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawAbtrackConfig) -> AbtrackConfig {
        AbtrackConfig {
            site: SiteConfig {
                origin: raw.site.origin.unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
                request_timeout_secs: raw.site.request_timeout_secs,
                cookie_max_age_days: raw
                    .site
                    .cookie_max_age_days
                    .unwrap_or(DEFAULT_COOKIE_MAX_AGE_DAYS),
            },
            profile: raw.profile,
        }
    }
}
