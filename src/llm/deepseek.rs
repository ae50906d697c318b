// src/llm/deepseek.rs
// DeepSeek scoring client (OpenAI-compatible chat completions, non-streaming)

use crate::llm::http::LlmHttpClient;
use crate::llm::{Provider, ScoringProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, Span};
use uuid::Uuid;

const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";

/// Scoring prompts are short single-turn requests; a tight completion cap
/// keeps latency and cost down.
const MAX_TOKENS: u32 = 16;

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
    content: Option<String>,
}

/// DeepSeek API client
pub struct DeepSeekScorer {
    api_key: String,
    model: String,
    http: LlmHttpClient,
}

impl DeepSeekScorer {
    /// Create a new DeepSeek client with the default scoring model
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.into())
    }

    /// Create a new DeepSeek client with a custom model
    pub fn with_model(api_key: String, model: String) -> Self {
        let http = LlmHttpClient::new(Duration::from_secs(30), Duration::from_secs(10));
        Self {
            api_key,
            model,
            http,
        }
    }
}

#[async_trait]
impl ScoringProvider for DeepSeekScorer {
    #[instrument(skip(self, prompt), fields(request_id, model = %self.model))]
    async fn score(&self, prompt: &str) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You score content against a category. Respond with a single integer from 0 to 100 and nothing else."},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": 0.0,
        })
        .to_string();

        let text = self
            .http
            .post_json_bearer(&request_id, DEEPSEEK_API_URL, &self.api_key, body)
            .await?;

        let response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("malformed DeepSeek response: {e}"))?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("DeepSeek response had no content"))?;

        debug!(request_id = %request_id, content = %content.trim(), "DeepSeek score response");
        Ok(content)
    }

    fn provider_type(&self) -> Provider {
        Provider::DeepSeek
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
