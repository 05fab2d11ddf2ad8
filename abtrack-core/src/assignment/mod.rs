//! Per-test version assignments
//!
//! A visitor's assigned version lives in a cookie named after the test. The
//! server reads the same cookie to keep serving that version, so it is the
//! source of truth for "is this visitor already a participant".

mod cookie;
mod store;

pub use cookie::{Cookie, CookieJar};
pub use store::CookieAssignmentStore;

use crate::descriptor::{TestId, Version};
use crate::error::StoreError;

/// Prefix of every assignment cookie.
pub const COOKIE_PREFIX: &str = "abtesting-";

/// Days an assignment cookie lives after confirmation.
pub const ASSIGNMENT_MAX_AGE_DAYS: i64 = 365;

/// Name of the cookie holding the version assigned for `test_id`.
pub fn cookie_name(test_id: &TestId) -> String {
    format!("{COOKIE_PREFIX}{test_id}-version")
}

/// Read/write access to confirmed version assignments.
///
/// Implementations must never replace an existing assignment with a
/// different version.
pub trait AssignmentStore: Send + Sync {
    /// Version this visitor was confirmed for, if any.
    fn get_assigned_version(&self, test_id: &TestId) -> Result<Option<Version>, StoreError>;

    /// Record a confirmed assignment. Repeating the call is a no-op.
    fn set_assigned_version(&self, test_id: &TestId, version: Version) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_name_uses_prefix_and_suffix() {
        assert_eq!(cookie_name(&TestId::from(7)), "abtesting-7-version");
        assert_eq!(cookie_name(&TestId::from("t1")), "abtesting-t1-version");
    }
}
