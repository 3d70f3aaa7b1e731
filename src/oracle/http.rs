//! OpenAI-compatible HTTP oracle (text-generation-webui, llama.cpp server, vLLM, ...).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{non_empty, Oracle, OracleError, OracleMode, OracleRequest};

/// Oracle backed by an OpenAI-compatible completion API.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    text: Option<String>,
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

impl HttpOracle {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:5000/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint for a mode.
    pub fn endpoint(&self, mode: OracleMode) -> String {
        match mode {
            OracleMode::Completion => format!("{}/completions", self.base_url),
            OracleMode::Chat => format!("{}/chat/completions", self.base_url),
        }
    }

    fn body(request: &OracleRequest) -> serde_json::Result<serde_json::Value> {
        let p = &request.params;
        match p.mode {
            OracleMode::Completion => serde_json::to_value(CompletionBody {
                prompt: &request.prompt,
                max_tokens: p.max_tokens,
                temperature: p.temperature,
                top_p: p.top_p,
                stop: &p.stop,
            }),
            OracleMode::Chat => serde_json::to_value(ChatBody {
                messages: [ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
                max_tokens: p.max_tokens,
                temperature: p.temperature,
                top_p: p.top_p,
                stop: &p.stop,
            }),
        }
    }
}

/// Pull the generated text out of a response body for the given mode.
pub(crate) fn extract_text(mode: OracleMode, body: &str) -> Result<String, OracleError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Malformed("no choices in response".into()))?;

    let text = match mode {
        OracleMode::Completion => choice.text,
        OracleMode::Chat => choice.message.and_then(|m| m.content),
    }
    .ok_or_else(|| OracleError::Malformed(format!("no {mode} text in first choice")))?;

    non_empty(&text)
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mode = request.params.mode;
        let url = self.endpoint(mode);
        let timeout = Duration::from_secs(request.params.timeout_secs);
        let body = Self::body(request).map_err(|e| OracleError::Malformed(e.to_string()))?;

        tracing::debug!(
            url = %url,
            mode = %mode,
            prompt_len = request.prompt.len(),
            max_tokens = request.params.max_tokens,
            "oracle request"
        );

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                OracleError::Timeout(timeout)
            } else {
                OracleError::Request(e.to_string())
            }
        };

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        let text = response.text().await.map_err(map_err)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "oracle returned an error status");
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let generated = extract_text(mode, &text)?;
        tracing::debug!(len = generated.len(), "oracle response received");
        Ok(generated)
    }
}
