//! Scriptable in-memory transport
//!
//! Records every request and answers with queued status codes, falling back
//! to a default status (200 unless changed). Endpoints can also be made to
//! fail at the transport level or to hang until the page unloads.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ParticipantPayload, Transport};
use crate::error::TransportError;

/// One request seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub payload: ParticipantPayload,
}

#[derive(Debug, Clone)]
enum Reply {
    Status(u16),
    Fail(String),
}

/// Mock implementation of [`Transport`] for tests.
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    hanging: Mutex<HashSet<String>>,
    default_status: u16,
}

impl RecordingTransport {
    /// Transport answering 200 to everything.
    pub fn new() -> Self {
        Self::with_default_status(200)
    }

    pub fn with_default_status(default_status: u16) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            hanging: Mutex::new(HashSet::new()),
            default_status,
        }
    }

    /// Queue a status for the next request to `endpoint`.
    pub fn respond_with(&self, endpoint: &str, status: u16) {
        self.queue(endpoint, Reply::Status(status));
    }

    /// Make the next request to `endpoint` fail before any response.
    pub fn fail_next(&self, endpoint: &str, reason: &str) {
        self.queue(endpoint, Reply::Fail(reason.to_string()));
    }

    /// Never answer requests to `endpoint`.
    pub fn hang(&self, endpoint: &str) {
        if let Ok(mut hanging) = self.hanging.lock() {
            hanging.insert(endpoint.to_string());
        }
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Requests sent to one endpoint.
    pub fn requests_to(&self, endpoint: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.endpoint == endpoint)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }

    fn queue(&self, endpoint: &str, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies
                .entry(endpoint.to_string())
                .or_default()
                .push_back(reply);
        }
    }

    fn next_reply(&self, endpoint: &str) -> Reply {
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.get_mut(endpoint).and_then(VecDeque::pop_front))
            .unwrap_or(Reply::Status(self.default_status))
    }

    fn is_hanging(&self, endpoint: &str) -> bool {
        self.hanging
            .lock()
            .map(|hanging| hanging.contains(endpoint))
            .unwrap_or(false)
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &ParticipantPayload,
    ) -> Result<u16, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                endpoint: endpoint.to_string(),
                payload: payload.clone(),
            });
        }

        if self.is_hanging(endpoint) {
            std::future::pending::<()>().await;
        }

        match self.next_reply(endpoint) {
            Reply::Status(status) => Ok(status),
            Reply::Fail(reason) => Err(TransportError::Request {
                url: endpoint.to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{TestId, Version};

    fn payload() -> ParticipantPayload {
        ParticipantPayload::new(TestId::from("t1"), Version::Control)
    }

    #[tokio::test]
    async fn answers_queued_then_default() {
        let transport = RecordingTransport::new();
        transport.respond_with("/r/", 500);

        assert_eq!(transport.post_json("/r/", &payload()).await.unwrap(), 500);
        assert_eq!(transport.post_json("/r/", &payload()).await.unwrap(), 200);
        assert_eq!(transport.requests_to("/r/").len(), 2);
    }

    #[tokio::test]
    async fn failures_are_recorded_too() {
        let transport = RecordingTransport::with_default_status(201);
        transport.fail_next("/g/", "connection reset");

        assert!(transport.post_json("/g/", &payload()).await.is_err());
        assert_eq!(transport.post_json("/g/", &payload()).await.unwrap(), 201);
        assert_eq!(transport.request_count(), 2);
    }
}
