//! Remote save endpoint client.

use crate::board::Board;
use crate::storage::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors talking to the save endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Request failed: {0}")]
    Request(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Status and body of an endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of `POST /api/save`.
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a> {
    /// `{ paths, view }`
    pub data: &'a Board,
    /// PNG data URL of the board.
    pub preview: &'a str,
}

/// Successful response from the save endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    pub url: String,
}

/// Error body returned by the save endpoint on a rejected payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Sends an already-serialized save request.
///
/// Kept as a trait so hosts and tests can swap the HTTP client.
pub trait SaveTransport {
    fn post_json(&self, body: String) -> BoxFuture<'_, TransportResult<TransportResponse>>;
}

/// [`SaveTransport`] backed by `reqwest`. Uses `fetch` on WASM, so the
/// browser's session cookie rides along with same-origin requests.
#[derive(Debug, Clone)]
pub struct HttpSaveTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSaveTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Parse an absolute endpoint URL.
    pub fn parse(endpoint: &str) -> TransportResult<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self::new(url))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SaveTransport for HttpSaveTransport {
    fn post_json(&self, body: String) -> BoxFuture<'_, TransportResult<TransportResponse>> {
        Box::pin(async move {
            log::debug!("POST {} ({} bytes)", self.endpoint, body.len());
            let response = self
                .client
                .post(self.endpoint.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;
            Ok(TransportResponse { status, body })
        })
    }
}
