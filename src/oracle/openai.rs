use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ORACLE_TIMEOUT_SECS;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Minimal OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ORACLE_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system + user prompt and return the first choice's text.
    /// An empty completion comes back as `"{}"`.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, OracleError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: user },
            ],
            temperature: 0.3,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "oracle request failed");
                OracleError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "oracle API error");
            return Err(OracleError::Api(format!("status {status}: {error_text}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Api(format!("unreadable response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "{}".to_string());

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "oracle chat completion"
        );
        Ok(content)
    }
}
