// src/llm/gemini.rs
// Google Gemini scoring client (generateContent, non-streaming)

use crate::llm::http::LlmHttpClient;
use crate::llm::{Provider, ScoringProvider};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, Span};
use uuid::Uuid;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Google Gemini API client
pub struct GeminiScorer {
    api_key: String,
    model: String,
    http: LlmHttpClient,
}

impl GeminiScorer {
    /// Create a new Gemini client with the default scoring model
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.into())
    }

    /// Create a new Gemini client with a custom model
    pub fn with_model(api_key: String, model: String) -> Self {
        let http = LlmHttpClient::new(Duration::from_secs(30), Duration::from_secs(10));
        Self {
            api_key,
            model,
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl ScoringProvider for GeminiScorer {
    #[instrument(skip(self, prompt), fields(request_id, model = %self.model))]
    async fn score(&self, prompt: &str) -> Result<String> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let body = json!({
            "system_instruction": {
                "parts": [{"text": "You score content against a category. Respond with a single integer from 0 to 100 and nothing else."}]
            },
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.0, "maxOutputTokens": 16}
        })
        .to_string();

        let url = self.endpoint();
        let api_key = self.api_key.clone();
        let text = self
            .http
            .execute_with_retry(&request_id, body, move |client, body| {
                client
                    .post(&url)
                    .header("x-goog-api-key", &api_key)
                    .header("Content-Type", "application/json")
                    .body(body)
            })
            .await?;

        let response: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| anyhow!("malformed Gemini response: {e}"))?;
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| anyhow!("Gemini response had no text part"))?;

        debug!(request_id = %request_id, content = %content.trim(), "Gemini score response");
        Ok(content)
    }

    fn provider_type(&self) -> Provider {
        Provider::Gemini
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserializes() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"42"}],"role":"model"}}]}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response.candidates[0].content.parts[0].text.as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiScorer::new("test-key".into());
        assert!(client.endpoint().ends_with("gemini-2.0-flash:generateContent"));
    }
}
