//! HTTP transport seam.
//!
//! [`RemoteActionClient`](super::RemoteActionClient) only knows how to turn
//! an action into an [`ActionRequest`] and a body back into an
//! [`ActionResult`](super::ActionResult). Moving bytes is the transport's
//! job, which keeps the client testable without a server.

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::config::StorefrontConfig;

/// Header carrying the anti-forgery token on mutating calls.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Errors raised while talking to the server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The connection failed before a response arrived. Not produced by
    /// [`HttpTransport`], whose failures arrive as [`Self::Http`]; other
    /// [`Transport`] implementations report theirs here.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub method: Method,
    /// Path and query, relative to the server origin.
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Anti-forgery token; `Some` only for mutating calls.
    pub csrf_token: Option<String>,
}

/// Raw response, before any JSON interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests to the storefront server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the full response body.
    async fn send(&self, request: ActionRequest) -> Result<TransportResponse, TransportError>;
}

// =============================================================================
// HttpTransport
// =============================================================================

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    session_cookie: Option<SecretString>,
}

impl HttpTransport {
    /// Build a transport for the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &StorefrontConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Server origin requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ActionRequest) -> Result<TransportResponse, TransportError> {
        let url = self.base_url.join(&request.path)?;

        let mut builder = self
            .client
            .request(request.method, url)
            .header("Accept", "application/json");

        if let Some(token) = &request.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header("Cookie", cookie.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "server returned non-success status"
            );
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

// =============================================================================
// Scripted transport (tests)
// =============================================================================
