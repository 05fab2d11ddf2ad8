//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use url::Url;

use super::{ParticipantPayload, Transport};
use crate::error::TransportError;

/// Sends tracking requests to a live site.
///
/// Endpoints rendered by the CMS are usually root-relative paths; they are
/// resolved against `origin`. Absolute endpoint URLs are used as-is.
pub struct HttpTransport {
    client: Client,
    origin: Url,
}

impl HttpTransport {
    pub fn new(origin: Url) -> Self {
        Self {
            client: Client::new(),
            origin,
        }
    }

    /// Transport with a client-level user agent and optional request timeout.
    pub fn with_options(
        origin: Url,
        user_agent: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_string());
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::Request {
            url: origin.to_string(),
            reason: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL for an endpoint.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, TransportError> {
        self.origin
            .join(endpoint)
            .map_err(|e| TransportError::InvalidUrl {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        payload: &ParticipantPayload,
    ) -> Result<u16, TransportError> {
        let url = self.resolve(endpoint)?;
        trace!(%url, test_id = %payload.test_id, version = %payload.version, "POST");

        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(Url::parse("https://www.example.com/blog/").unwrap())
    }

    #[test]
    fn root_relative_endpoints_resolve_against_origin() {
        let url = transport()
            .resolve("/abtesting/register-participant/")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.example.com/abtesting/register-participant/"
        );
    }

    #[test]
    fn absolute_endpoints_are_kept() {
        let url = transport()
            .resolve("https://tracking.example.net/goal-reached/")
            .unwrap();
        assert_eq!(url.as_str(), "https://tracking.example.net/goal-reached/");
    }

    #[test]
    fn builder_accepts_user_agent_and_timeout() {
        let transport = HttpTransport::with_options(
            Url::parse("http://localhost:8000").unwrap(),
            Some("abtrack-test"),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(transport.origin().as_str(), "http://localhost:8000/");
    }

    #[tokio::test]
    async fn unreachable_site_is_a_transport_error() {
        let transport = HttpTransport::new(Url::parse("http://127.0.0.1:9").unwrap());
        let payload = ParticipantPayload::new("t1".into(), crate::Version::Control);

        let result = transport.post_json("/goal-reached/", &payload).await;
        assert!(matches!(result, Err(TransportError::Request { .. })));
    }
}
