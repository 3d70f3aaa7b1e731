//! Text-generation oracle.
//!
//! The oracle is an external, untrusted service: a prompt goes in, text comes
//! out, and anything can fail. Callers stage its output and only write to the
//! memory store after an explicit approval.

pub mod http;

pub use http::HttpOracle;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GenerationParams;

/// Which endpoint contract the oracle speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleMode {
    /// `POST /completions` with `prompt`, answer in `choices[0].text`.
    Completion,
    /// `POST /chat/completions` with `messages`, answer in `choices[0].message.content`.
    Chat,
}

impl OracleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completion => "completion",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for OracleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

impl OracleRequest {
    pub fn new(prompt: impl Into<String>, params: &GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            params: params.clone(),
        }
    }
}

/// Why a generation produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Connection refused, DNS failure, body read failure.
    #[error("oracle unreachable: {0}")]
    Request(String),

    #[error("oracle timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Non-2xx HTTP status.
    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body did not have the shape the endpoint contract promises.
    #[error("malformed oracle response: {0}")]
    Malformed(String),

    /// The oracle answered with blank text.
    #[error("oracle returned an empty response")]
    Empty,
}

/// A text-generation backend.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate text for a prompt. The result is trimmed and never empty.
    async fn generate(&self, request: &OracleRequest) -> Result<String, OracleError>;
}

/// Trim oracle output and reject blank answers.
pub(crate) fn non_empty(text: &str) -> Result<String, OracleError> {
    let text = text.trim();
    if text.is_empty() {
        Err(OracleError::Empty)
    } else {
        Ok(text.to_string())
    }
}
