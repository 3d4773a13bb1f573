//! Remote verdict client for the analysis endpoint.
//!
//! One POST per user turn, JSON in and out, no retry and no client-side
//! timeout: the call resolves when the network stack does. Failures are
//! typed here and collapsed to fixed user-facing replies by
//! [`reply_text`].

use crate::config::VerdictConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Reply shown when the endpoint answers without a usable verdict.
pub const MISSING_VERDICT_REPLY: &str = "Unable to analyze the news at this time.";

/// Reply shown when the request fails outright.
pub const REQUEST_FAILED_REPLY: &str =
    "An error occurred while analyzing the news. Please try again later.";

/// Typed failure modes at the client boundary.
///
/// The chat surface never distinguishes these; they exist so logs and
/// callers can.
#[derive(Debug, thiserror::Error)]
pub enum VerdictError {
    /// Connection, TLS, or request transport failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered outside the success range.
    #[error("endpoint returned {0}")]
    Status(reqwest::StatusCode),

    /// The response body was not valid JSON.
    #[error("response is not valid JSON: {0}")]
    Decode(String),

    /// The response parsed but carried no verdict text.
    #[error("response carried no verdict")]
    MissingVerdict,
}

/// Request body for the analysis endpoint.
///
/// The mode fields ride in the body; the call is always non-streaming.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    input_value: &'a str,
    input_type: &'static str,
    output_type: &'static str,
    stream: bool,
}

/// Response body from the analysis endpoint.
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    output: Option<String>,
}

/// HTTP caller for the single verdict endpoint.
#[derive(Debug, Clone)]
pub struct VerdictClient {
    http: reqwest::Client,
    endpoint: String,
}

impl VerdictClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &VerdictConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint_url.clone(),
        }
    }

    /// The endpoint URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one claim for analysis and return the verdict text.
    ///
    /// An absent, null, or empty `output` field is reported as
    /// [`VerdictError::MissingVerdict`].
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-success statuses, and
    /// unparseable or verdict-less responses.
    pub async fn analyze(&self, claim: &str) -> Result<String, VerdictError> {
        let body = AnalyzeRequest {
            input_value: claim,
            input_type: "chat",
            output_type: "chat",
            stream: false,
        };

        debug!("posting claim to {}", self.endpoint);
        let response = self.http.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerdictError::Status(status));
        }

        let bytes = response.bytes().await?;
        let parsed: AnalyzeResponse =
            serde_json::from_slice(&bytes).map_err(|e| VerdictError::Decode(e.to_string()))?;

        match parsed.output {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(VerdictError::MissingVerdict),
        }
    }
}

/// Collapse an analysis result into the text shown in chat.
///
/// Every failure degrades to one of two fixed replies; the distinction
/// between failure kinds goes to the log only.
pub fn reply_text(result: Result<String, VerdictError>) -> String {
    match result {
        Ok(text) => text,
        Err(VerdictError::MissingVerdict) => {
            warn!("endpoint answered without a verdict");
            MISSING_VERDICT_REPLY.to_owned()
        }
        Err(e) => {
            error!("verdict request failed: {e}");
            REQUEST_FAILED_REPLY.to_owned()
        }
    }
}
