//! Cookie-backed assignment storage

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use tracing::debug;

use super::{ASSIGNMENT_MAX_AGE_DAYS, AssignmentStore, Cookie, CookieJar, cookie_name};
use crate::descriptor::{TestId, Version};
use crate::error::StoreError;

/// Cookie jar file name inside a profile directory
const COOKIES_FILE: &str = "cookies.json";

/// Assignment store over a browser-profile cookie jar.
///
/// In-memory by default; [`CookieAssignmentStore::load`] ties the jar to a
/// file so assignments survive across processes.
pub struct CookieAssignmentStore {
    jar: Mutex<CookieJar>,
    file_path: Option<PathBuf>,
    max_age: Duration,
}

impl CookieAssignmentStore {
    /// Empty jar that is never persisted.
    pub fn in_memory() -> Self {
        Self::from_jar(CookieJar::new())
    }

    /// Store over an existing jar, e.g. one parsed from `document.cookie`.
    pub fn from_jar(jar: CookieJar) -> Self {
        Self {
            jar: Mutex::new(jar),
            file_path: None,
            max_age: Duration::days(ASSIGNMENT_MAX_AGE_DAYS),
        }
    }

    /// Load the jar from `profile_dir`, or start empty if none exists yet.
    pub fn load(profile_dir: &Path) -> Result<Self, StoreError> {
        let file_path = profile_dir.join(COOKIES_FILE);

        let mut jar = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path).map_err(|source| StoreError::Read {
                what: "cookie jar",
                source,
            })?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            CookieJar::new()
        };

        let purged = jar.purge_expired(Utc::now());
        if purged > 0 {
            debug!(purged, "Dropped expired cookies");
        }

        Ok(Self {
            file_path: Some(file_path),
            ..Self::from_jar(jar)
        })
    }

    /// Override the assignment cookie lifetime.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Copy of the current jar.
    pub fn snapshot(&self) -> Result<CookieJar, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// `document.cookie` view of the jar.
    pub fn cookie_header(&self) -> Result<String, StoreError> {
        Ok(self.lock()?.header(Utc::now()))
    }

    /// Delete the assignment cookie for one test, as a visitor clearing
    /// cookies would. Returns whether it existed.
    pub fn forget(&self, test_id: &TestId) -> Result<bool, StoreError> {
        let mut jar = self.lock()?;
        let removed = jar.remove(&cookie_name(test_id));
        if removed {
            self.persist(&jar)?;
        }
        Ok(removed)
    }

    /// Delete every cookie in the jar.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut jar = self.lock()?;
        jar.clear();
        self.persist(&jar)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CookieJar>, StoreError> {
        self.jar
            .lock()
            .map_err(|_| StoreError::Poisoned("cookie jar"))
    }

    fn persist(&self, jar: &CookieJar) -> Result<(), StoreError> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                what: "profile directory",
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(jar).map_err(|source| StoreError::Serialize {
            what: "cookie jar",
            source,
        })?;

        std::fs::write(path, content).map_err(|source| StoreError::Write {
            what: "cookie jar",
            source,
        })
    }
}

impl AssignmentStore for CookieAssignmentStore {
    fn get_assigned_version(&self, test_id: &TestId) -> Result<Option<Version>, StoreError> {
        let jar = self.lock()?;
        let Some(value) = jar.get(&cookie_name(test_id), Utc::now()) else {
            return Ok(None);
        };

        match value.parse() {
            Ok(version) => Ok(Some(version)),
            Err(e) => {
                debug!(test_id = %test_id, error = %e, "Ignoring unreadable assignment cookie");
                Ok(None)
            }
        }
    }

    fn set_assigned_version(&self, test_id: &TestId, version: Version) -> Result<(), StoreError> {
        let name = cookie_name(test_id);
        let now = Utc::now();
        let mut jar = self.lock()?;

        if let Some(existing) = jar.get(&name, now).and_then(|v| v.parse::<Version>().ok()) {
            if existing != version {
                debug!(
                    test_id = %test_id,
                    kept = %existing,
                    offered = %version,
                    "Assignment already pinned, keeping existing version"
                );
            }
            return Ok(());
        }

        let cookie = Cookie::site_wide(name, version.as_str(), now, self.max_age);
        debug!(cookie = %cookie.to_set_cookie(), "Pinning assignment");
        jar.set(cookie);
        self.persist(&jar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absent_cookie_means_not_a_participant() {
        let store = CookieAssignmentStore::in_memory();
        assert_eq!(store.get_assigned_version(&TestId::from(1)).unwrap(), None);
    }

    #[test]
    fn set_then_get() {
        let store = CookieAssignmentStore::in_memory();
        let test = TestId::from(1);

        store.set_assigned_version(&test, Version::Variant).unwrap();

        assert_eq!(
            store.get_assigned_version(&test).unwrap(),
            Some(Version::Variant)
        );
        assert!(store.cookie_header().unwrap().contains("abtesting-1-version=variant"));
    }

    #[test]
    fn existing_assignment_is_never_replaced() {
        let store = CookieAssignmentStore::in_memory();
        let test = TestId::from(1);

        store.set_assigned_version(&test, Version::Control).unwrap();
        store.set_assigned_version(&test, Version::Variant).unwrap();
        store.set_assigned_version(&test, Version::Control).unwrap();

        assert_eq!(
            store.get_assigned_version(&test).unwrap(),
            Some(Version::Control)
        );
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn garbage_cookie_reads_as_absent() {
        let store =
            CookieAssignmentStore::from_jar(CookieJar::parse_header("abtesting-1-version=blue"));
        let test = TestId::from(1);

        assert_eq!(store.get_assigned_version(&test).unwrap(), None);

        store.set_assigned_version(&test, Version::Variant).unwrap();
        assert_eq!(
            store.get_assigned_version(&test).unwrap(),
            Some(Version::Variant)
        );
    }

    #[test]
    fn expired_assignment_reads_as_absent() {
        let store = CookieAssignmentStore::in_memory().with_max_age(Duration::seconds(-1));
        let test = TestId::from(1);

        store.set_assigned_version(&test, Version::Variant).unwrap();
        assert_eq!(store.get_assigned_version(&test).unwrap(), None);
    }

    #[test]
    fn forget_removes_only_that_test() {
        let store = CookieAssignmentStore::in_memory();
        store
            .set_assigned_version(&TestId::from(1), Version::Variant)
            .unwrap();
        store
            .set_assigned_version(&TestId::from(2), Version::Control)
            .unwrap();

        assert!(store.forget(&TestId::from(1)).unwrap());
        assert!(!store.forget(&TestId::from(1)).unwrap());
        assert_eq!(store.get_assigned_version(&TestId::from(1)).unwrap(), None);
        assert_eq!(
            store.get_assigned_version(&TestId::from(2)).unwrap(),
            Some(Version::Control)
        );
    }

    #[test]
    fn persists_across_loads() {
        let temp_dir = tempdir().unwrap();

        {
            let store = CookieAssignmentStore::load(temp_dir.path()).unwrap();
            store
                .set_assigned_version(&TestId::from(9), Version::Control)
                .unwrap();
        }

        {
            let store = CookieAssignmentStore::load(temp_dir.path()).unwrap();
            assert_eq!(
                store.get_assigned_version(&TestId::from(9)).unwrap(),
                Some(Version::Control)
            );
        }
    }

    #[test]
    fn corrupt_jar_file_loads_empty() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join(COOKIES_FILE), "not json").unwrap();

        let store = CookieAssignmentStore::load(temp_dir.path()).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }
}
