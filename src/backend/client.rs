/// Backend HTTP client implementation.
///
/// This module provides `HttpBackendClient` for talking to the document
/// ingest and ask endpoints, along with error types and a builder for
/// configuration. The `BackendClient` trait is the seam the rest of the
/// engine is mocked through in tests.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::types::{AskResponse, IngestResponse};

/// Default backend base URL when neither the builder nor the environment
/// provides one.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Backend-reported errors in an otherwise successful exchange
    #[error("backend error: {message}")]
    Api { message: String },

    /// The response body was not the expected JSON shape
    #[error("malformed backend response: {0}")]
    Decode(#[source] reqwest::Error),

    /// Invalid base URL configuration error
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Async contract for the two backend endpoints.
///
/// This trait enables mocking in unit and integration tests and keeps the
/// engine independent of the transport.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Uploads a document payload and returns the ingest response.
    async fn ingest_upload(
        &self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError>;

    /// Asks the backend to fetch and ingest a remote document.
    async fn ingest_url(
        &self,
        url: &str,
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError>;

    /// Submits the question list for an ingested document.
    async fn ask(
        &self,
        handle: &str,
        questions: &[String],
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<AskResponse, BackendError>;
}

/// Builder for constructing `HttpBackendClient` instances.
///
/// # Examples
///
/// ```
/// use glance::HttpBackendClientBuilder;
///
/// let client = HttpBackendClientBuilder::new()
///     .base_url("http://localhost:8000")
///     .build()
///     .expect("Failed to create client");
/// ```
#[derive(Debug, Default)]
pub struct HttpBackendClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpBackendClientBuilder {
    /// Creates a new `HttpBackendClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the backend.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout. Defaults to 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `HttpBackendClient` with the configured settings.
    ///
    /// If `base_url()` was not called, this method checks the
    /// `GLANCE_BACKEND_URL` environment variable and falls back to
    /// `http://localhost:8000`.
    pub fn build(self) -> Result<HttpBackendClient, BackendError> {
        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            std::env::var("GLANCE_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        reqwest::Url::parse(&base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(60)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(BackendError::Network)?;

        Ok(HttpBackendClient { client, base_url })
    }
}

/// HTTP client for the document ingest and ask endpoints.
///
/// Construct it with `HttpBackendClientBuilder`. The client never retries
/// on its own: a failed call surfaces immediately and retrying is the
/// caller's decision.
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackendClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the bearer header when a credential is present.
    fn authorized(
        request: reqwest::RequestBuilder,
        credential: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match credential {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Checks the status and decodes the JSON body.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
            });
        }
        response.json::<T>().await.map_err(BackendError::Decode)
    }
}

/// Classifies a send failure as timeout or plain network error.
fn send_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(err)
    } else {
        BackendError::Network(err)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn ingest_upload(
        &self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        let url = self.endpoint("/api/documents");
        debug!(name, size = bytes.len(), "POST {url}");

        let part = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime)
            .map_err(|_| BackendError::Api {
                message: format!("invalid MIME type: {mime}"),
            })?;
        let mut form = multipart::Form::new().part("document", part);
        if let Some(flag) = trial_flag {
            form = form.text("trial", flag.to_string());
        }

        let request = Self::authorized(self.client.post(&url).multipart(form), credential);
        let response = request.send().await.map_err(send_error)?;
        Self::decode(response).await
    }

    async fn ingest_url(
        &self,
        document_url: &str,
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        let url = self.endpoint("/api/documents");
        debug!(document_url, "POST {url}");

        let mut body = serde_json::json!({ "url": document_url });
        if let Some(flag) = trial_flag {
            body["trial"] = serde_json::Value::String(flag.to_string());
        }

        let request = Self::authorized(self.client.post(&url).json(&body), credential);
        let response = request.send().await.map_err(send_error)?;
        Self::decode(response).await
    }

    async fn ask(
        &self,
        handle: &str,
        questions: &[String],
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<AskResponse, BackendError> {
        let url = self.endpoint("/api/answers");
        debug!(handle, count = questions.len(), "POST {url}");

        let mut body = serde_json::json!({
            "handle": handle,
            "questions": questions,
        });
        if let Some(flag) = trial_flag {
            body["trial"] = serde_json::Value::String(flag.to_string());
        }

        let request = Self::authorized(self.client.post(&url).json(&body), credential);
        let response = request.send().await.map_err(send_error)?;
        Self::decode(response).await
    }
}
