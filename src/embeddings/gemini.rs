// src/embeddings/gemini.rs
// Google Gemini embeddings client (embedContent)

use crate::embeddings::EmbeddingProvider;
use crate::llm::http::LlmHttpClient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "text-embedding-004";

/// Max characters to embed; longer text is truncated at a char boundary
const MAX_TEXT_CHARS: usize = 16_000;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini embeddings client, fixed output dimensionality per deployment
pub struct GeminiEmbeddings {
    api_key: String,
    model: String,
    dimensions: usize,
    http: LlmHttpClient,
}

impl GeminiEmbeddings {
    pub fn new(api_key: String, dimensions: usize) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.into(), dimensions)
    }

    pub fn with_model(api_key: String, model: String, dimensions: usize) -> Self {
        let http = LlmHttpClient::new(Duration::from_secs(30), Duration::from_secs(10));
        Self {
            api_key,
            model,
            dimensions,
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:embedContent", self.model)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request_id = Uuid::new_v4().to_string();
        let truncated: String = text.chars().take(MAX_TEXT_CHARS).collect();

        let body = json!({
            "model": format!("models/{}", self.model),
            "content": {"parts": [{"text": truncated}]},
            "outputDimensionality": self.dimensions,
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

        let response: EmbedResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("malformed embedding response: {e}"))?;

        debug!(
            request_id = %request_id,
            dims = response.embedding.values.len(),
            "Embedding generated"
        );
        Ok(response.embedding.values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
