// src/scoring/provider.rs
// Chain strategy backed by an LLM scoring provider, gated by the rate limiter

use crate::limiter::RateLimiter;
use crate::llm::{parse_score, Provider, ScoringProvider};
use crate::scoring::ScoreStrategy;
use crate::types::CategoryDefinition;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a [`ScoringProvider`] as a chain strategy: renders the category
/// prompt, acquires a rate-limit token, and coerces the raw response to a
/// numeric score.
pub struct ProviderStrategy {
    client: Arc<dyn ScoringProvider>,
    limiter: Arc<RateLimiter>,
}

impl ProviderStrategy {
    pub fn new(client: Arc<dyn ScoringProvider>, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }
}

#[async_trait]
impl ScoreStrategy for ProviderStrategy {
    async fn score(
        &self,
        content: &str,
        urls: &[String],
        category: &CategoryDefinition,
    ) -> Result<u8> {
        let prompt = category.render_prompt(content, urls);

        self.limiter.acquire(self.client.provider_type()).await;
        let raw = self.client.score(&prompt).await?;

        Ok(parse_score(&raw))
    }

    fn provider_type(&self) -> Provider {
        self.client.provider_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedProvider {
        response: String,
    }

    #[async_trait]
    impl ScoringProvider for ScriptedProvider {
        async fn score(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
        fn provider_type(&self) -> Provider {
            Provider::DeepSeek
        }
        fn model_name(&self) -> String {
            "scripted".into()
        }
    }

    fn category() -> CategoryDefinition {
        CategoryDefinition {
            name: "todo".into(),
            prompt: "Rate: {content}".into(),
            auto_confirm: 95,
            suggest: 60,
            enabled: true,
            signal_domains: vec![],
            signal_patterns: vec![],
            signal_scripts: vec![],
        }
    }

    #[tokio::test]
    async fn test_parses_numeric_response() {
        let strategy = ProviderStrategy::new(
            Arc::new(ScriptedProvider {
                response: "Score: 88".into(),
            }),
            Arc::new(RateLimiter::default()),
        );
        let score = strategy.score("buy milk", &[], &category()).await.unwrap();
        assert_eq!(score, 88);
    }

    #[tokio::test]
    async fn test_garbage_response_coerces_to_zero() {
        let strategy = ProviderStrategy::new(
            Arc::new(ScriptedProvider {
                response: "I cannot rate this.".into(),
            }),
            Arc::new(RateLimiter::default()),
        );
        let score = strategy.score("buy milk", &[], &category()).await.unwrap();
        assert_eq!(score, 0);
    }
}
