//! Durable storage for the goal ledger
//!
//! Modelled on browser local storage: one key, one string value. Parsing
//! and mutation live in [`PendingGoals`](super::PendingGoals).

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::StoreError;

/// Storage key the ledger is kept under.
pub const LEDGER_STORAGE_KEY: &str = "abtesting-goals";

/// A single durable string slot.
pub trait GoalLedgerStore: Send + Sync {
    /// Stored value, `None` if nothing was ever written.
    fn read(&self) -> Result<Option<String>, StoreError>;

    fn write(&self, value: &str) -> Result<(), StoreError>;
}

/// In-memory slot for tests and short-lived agents.
#[derive(Default)]
pub struct MemoryLedgerStore {
    value: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `raw`, which need not be valid JSON.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
            writes: AtomicUsize::new(0),
        }
    }

    /// Current raw value.
    pub fn raw(&self) -> Option<String> {
        self.value.lock().ok().and_then(|value| value.clone())
    }

    /// How many times `write` has been called.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl GoalLedgerStore for MemoryLedgerStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        let value = self
            .value
            .lock()
            .map_err(|_| StoreError::Poisoned("goal ledger"))?;
        Ok(value.clone())
    }

    fn write(&self, value: &str) -> Result<(), StoreError> {
        let mut slot = self
            .value
            .lock()
            .map_err(|_| StoreError::Poisoned("goal ledger"))?;
        *slot = Some(value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Slot backed by a file inside a profile directory.
pub struct FileLedgerStore {
    file_path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(profile_dir: &Path) -> Self {
        Self {
            file_path: profile_dir.join(format!("{LEDGER_STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Remove the stored ledger, as clearing site data would.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                what: "goal ledger",
                source,
            }),
        }
    }
}

impl GoalLedgerStore for FileLedgerStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.file_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                what: "goal ledger",
                source,
            }),
        }
    }

    fn write(&self, value: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                what: "profile directory",
                source,
            })?;
        }

        std::fs::write(&self.file_path, value).map_err(|source| StoreError::Write {
            what: "goal ledger",
            source,
        })
    }
}
