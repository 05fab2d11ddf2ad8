//! XDG Base Directory paths for abtrack.
//!
//! The CLI keeps its simulated browser profile (cookie jar and goal ledger)
//! under the data directory and its layered configuration under the config
//! directory, using XDG locations on every platform.

use std::path::PathBuf;

const APP_DIR: &str = "abtrack";

/// Get the abtrack config directory.
///
/// Returns `$XDG_CONFIG_HOME/abtrack` if set, otherwise `~/.config/abtrack`.
///
/// # Examples
///
/// ```
/// use abtrack_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the abtrack data directory.
///
/// Returns `$XDG_DATA_HOME/abtrack` if set, otherwise `~/.local/share/abtrack`.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default location of the simulated browser profile.
pub fn profile_dir() -> PathBuf {
    data_dir().join("profile")
}

fn xdg_dir(env_var: &str, home_fallback: &str) -> PathBuf {
    if let Ok(base) = std::env::var(env_var) {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_fallback).join(APP_DIR)
    } else {
        PathBuf::from(home_fallback).join(APP_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_abtrack() {
        let path = config_dir();
        assert!(
            path.ends_with("abtrack"),
            "config_dir should end with 'abtrack'"
        );
    }

    #[test]
    fn test_profile_dir_is_under_data_dir() {
        assert!(profile_dir().starts_with(data_dir()));
        assert!(profile_dir().ends_with("profile"));
    }

    #[test]
    fn test_xdg_env_is_respected() {
        unsafe {
            std::env::set_var("ABTRACK_TEST_XDG_HOME", "/tmp/test-xdg");
        }
        let path = xdg_dir("ABTRACK_TEST_XDG_HOME", ".unused");
        assert_eq!(path, PathBuf::from("/tmp/test-xdg/abtrack"));
        unsafe {
            std::env::remove_var("ABTRACK_TEST_XDG_HOME");
        }
    }
}
