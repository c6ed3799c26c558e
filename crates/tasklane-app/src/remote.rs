//! Remote task API contract and its HTTP implementation.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tasklane_core::{TaskDraft, TaskId, TaskPatch, WireTask};
use thiserror::Error;
use tracing::{error, info};

/// Operations the sync service needs from the backend.
#[allow(async_fn_in_trait)]
pub trait RemoteTaskApi {
    /// Error type bubbled up from the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch every task.
    ///
    /// # Errors
    /// Returns a transport-specific error when the request fails.
    async fn list_tasks(&self) -> Result<Vec<WireTask>, Self::Error>;

    /// Create a task and return the stored version.
    ///
    /// # Errors
    /// Returns a transport-specific error when the request fails.
    async fn create_task(&self, draft: &TaskDraft) -> Result<WireTask, Self::Error>;

    /// Apply a partial update and return the stored version.
    ///
    /// # Errors
    /// Returns a transport-specific error when the request fails.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<WireTask, Self::Error>;

    /// Delete a task.
    ///
    /// # Errors
    /// Returns a transport-specific error when the request fails.
    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error>;
}

/// Failures surfaced by [`HttpTaskApi`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL cannot be used.
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Connection, timeout or other transport failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success status; carries the response body.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },
    /// Response body is not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// JSON-over-HTTP client for the task list endpoint.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base: Url,
}

impl HttpTaskApi {
    /// Build a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "URL cannot carry path segments".into(),
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// Endpoint serving the whole collection.
    #[must_use]
    pub fn collection_url(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("");
        }
        url
    }

    /// Endpoint for a single task.
    #[must_use]
    pub fn item_url(&self, id: &TaskId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<String>) -> Result<String, ApiError> {
        info!(method = %method, url = %url, "API request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            error!(method = %method, url = %url, error = %e, "API request error");
            ApiError::Transport(e)
        })?;
        let status = response.status();
        info!(status = status.as_u16(), url = %url, "API response");

        let text = response.text().await?;
        if !status.is_success() {
            error!(status = status.as_u16(), url = %url, "API response error");
            return Err(ApiError::Status { status, body: text });
        }
        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_str(text)?)
}

impl RemoteTaskApi for HttpTaskApi {
    type Error = ApiError;

    async fn list_tasks(&self) -> Result<Vec<WireTask>, Self::Error> {
        let text = self.send(Method::GET, self.collection_url(), None).await?;
        decode(&text)
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<WireTask, Self::Error> {
        let body = serde_json::to_string(draft)?;
        let text = self
            .send(Method::POST, self.collection_url(), Some(body))
            .await?;
        decode(&text)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<WireTask, Self::Error> {
        let body = serde_json::to_string(patch)?;
        let text = self.send(Method::PUT, self.item_url(id), Some(body)).await?;
        decode(&text)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), Self::Error> {
        self.send(Method::DELETE, self.item_url(id), None).await?;
        Ok(())
    }
}
