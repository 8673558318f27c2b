//! Raw `GET` primitive the fetcher retries around.
//!
//! A [`Transport`] only moves bytes: it returns whatever status the server answered
//! with and fails with [`FetchError::Network`] when nothing came back. Status checks
//! and JSON decoding belong to [`crate::fetch::RetryingFetcher`].

use crate::error::{BuildError, FetchError};
use async_trait::async_trait;
use std::time::Duration;

/// Timeout applied to each HTTP request by [`HttpTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status line and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// `200 OK` with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, status_text: "OK".to_string(), body: body.into() }
    }

    pub fn with_status(status: u16, status_text: impl Into<String>) -> Self {
        Self { status, status_text: status_text.into(), body: Vec::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network call primitive: `GET url`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, BuildError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BuildError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}
