//! Requests to the tracking endpoints
//!
//! Both endpoints take the same JSON body, `{"test_id": .., "version": ..}`.
//! Registration cares about the status code; goal reports ignore it.

mod http;
mod recording;

pub use http::HttpTransport;
pub use recording::{RecordedRequest, RecordingTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::descriptor::{TestId, Version};
use crate::error::TransportError;

/// Body sent to both tracking endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPayload {
    pub test_id: TestId,
    pub version: Version,
}

impl ParticipantPayload {
    pub fn new(test_id: TestId, version: Version) -> Self {
        Self { test_id, version }
    }
}

/// Sends tracking requests. Implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` as JSON to `endpoint`, returning the HTTP status.
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &ParticipantPayload,
    ) -> Result<u16, TransportError>;
}
