//! Error types for abtrack-core
//!
//! None of these escape the [`TrackingAgent`](crate::TrackingAgent): the agent
//! logs them and carries on. They exist so the components underneath can be
//! tested and composed with ordinary `?` propagation.

use thiserror::Error;

/// Top-level error type for abtrack-core
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from parsing the server-rendered tracking parameters
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Invalid tracking parameters JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown test version: {0}")]
    UnknownVersion(String),
}

/// Errors from the persisted client state (cookies and the goal ledger)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {what}: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned: {0}")]
    Poisoned(&'static str),
}

/// Errors from sending a request to the tracking endpoints
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_write_displays_correctly() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = StoreError::Write {
            what: "goal ledger",
            source: io_error,
        };
        assert!(error.to_string().contains("Failed to write goal ledger"));
        assert!(error.to_string().contains("read-only"));
    }

    #[test]
    fn transport_error_request_displays_correctly() {
        let error = TransportError::Request {
            url: "https://example.com/abtesting/goal-reached/".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(error.to_string().contains("goal-reached"));
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn descriptor_error_unknown_version_displays_correctly() {
        let error = DescriptorError::UnknownVersion("treatment".to_string());
        assert!(error.to_string().contains("treatment"));
    }

    #[test]
    fn tracker_error_converts_from_store_error() {
        let error: TrackerError = StoreError::Poisoned("cookie jar").into();
        assert!(matches!(error, TrackerError::Store(_)));
        assert!(error.to_string().contains("Storage error"));
    }

    #[test]
    fn tracker_error_converts_from_transport_error() {
        let error: TrackerError = TransportError::InvalidUrl {
            url: "http://[::1".to_string(),
            reason: "invalid IPv6 address".to_string(),
        }
        .into();
        assert!(matches!(error, TrackerError::Transport(_)));
    }
}
