//! [`HttpOracle`] – client for the remote text-generation endpoint.
//!
//! The endpoint is a small HTTP service (typically a notebook exposed through
//! an ngrok tunnel) that accepts
//!
//! ```json
//! { "prompt": "...", "craziness": 7 }
//! ```
//!
//! and answers `200 OK` with `{ "generated_text": "..." }`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use teddy_runtime::oracle::{HttpOracle, Oracle};
//!
//! # async fn demo() -> Result<(), teddy_runtime::oracle::OracleError> {
//! let oracle = HttpOracle::new("http://localhost:5000/generate", Duration::from_secs(30))?;
//! // Requires a running endpoint – skipped in unit tests.
//! let text = oracle.generate("Say hello.", 3).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header that makes ngrok skip its browser interstitial page, which would
/// otherwise be returned as HTML instead of the JSON payload.
pub const SKIP_TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from a single generation request.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The HTTP request failed, timed out or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body did not have the expected shape.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Oracle trait
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that turns a prompt and an intensity level into raw text.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate a reply for `prompt` at the given `intensity`.
    ///
    /// The returned text is raw: it may be quoted, truncated or empty.
    async fn generate(&self, prompt: &str, intensity: u8) -> Result<String, OracleError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    craziness: u8,
}

#[derive(Deserialize)]
struct GenerateResponse {
    generated_text: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpOracle
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for the generation endpoint.
///
/// Construct once and reuse across turns; every request carries the timeout
/// given at construction.
pub struct HttpOracle {
    url: String,
    client: reqwest::Client,
}

impl HttpOracle {
    /// Create a client posting to `url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Http`] if the underlying HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialise).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn generate(&self, prompt: &str, intensity: u8) -> Result<String, OracleError> {
        let body = GenerateRequest {
            prompt,
            craziness: intensity,
        };

        let response = self
            .client
            .post(&self.url)
            .header(SKIP_TUNNEL_WARNING_HEADER, "true")
            .json(&body)
            .send()
            .await?;

        tracing::debug!(status = %response.status(), "oracle responded");

        let payload: GenerateResponse = response.error_for_status()?.json().await?;
        payload
            .generated_text
            .ok_or_else(|| OracleError::BadResponse("missing generated_text field".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_craziness_field() {
        let body = GenerateRequest {
            prompt: "hi",
            craziness: 7,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"prompt":"hi","craziness":7}"#);
    }

    #[test]
    fn response_body_parses_generated_text() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"generated_text":"Hello.","extra":1}"#).unwrap();
        assert_eq!(parsed.generated_text.as_deref(), Some("Hello."));
    }

    #[test]
    fn response_without_field_parses_to_none() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"detail":"busy"}"#).unwrap();
        assert!(parsed.generated_text.is_none());
    }

    #[test]
    fn http_oracle_constructed_without_panic() {
        let oracle = HttpOracle::new("http://localhost:5000/generate", Duration::from_secs(30))
            .expect("client builds");
        assert_eq!(oracle.url(), "http://localhost:5000/generate");
    }

    #[tokio::test]
    async fn generate_returns_http_error_when_endpoint_unreachable() {
        // Nothing listens on the discard port – must be an error, not a panic.
        let oracle = HttpOracle::new("http://127.0.0.1:9/generate", Duration::from_secs(2))
            .expect("client builds");
        let result = oracle.generate("hello", 0).await;
        assert!(matches!(result, Err(OracleError::Http(_))));
    }
}
