// src/scoring/mod.rs
// Scoring strategies: ordered fallback chain plus deterministic fast-path

mod heuristic;
mod provider;

pub use heuristic::{fast_path_score, HeuristicStrategy};
pub use provider::ProviderStrategy;

use crate::config::ApiKeys;
use crate::limiter::RateLimiter;
use crate::llm::{DeepSeekScorer, GeminiScorer, Provider, ScoringProvider};
use crate::types::CategoryDefinition;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One scoring strategy in the fallback chain.
///
/// Implementations must return a score in [0, 100]; failures are recoverable
/// and fall through to the next strategy in the chain.
#[async_trait]
pub trait ScoreStrategy: Send + Sync {
    async fn score(
        &self,
        content: &str,
        urls: &[String],
        category: &CategoryDefinition,
    ) -> Result<u8>;

    fn provider_type(&self) -> Provider;
}

/// Merge a chain score with an optional fast-path score by taking the max.
/// Commutative and idempotent; a confident deterministic signal is never
/// suppressed by a lower LLM score, and vice versa.
pub fn merge_scores(chain: u8, fast_path: Option<u8>) -> u8 {
    match fast_path {
        Some(fast) => chain.max(fast),
        None => chain,
    }
}

/// Ordered fallback chain of scoring strategies.
///
/// Strategies are tried in order per category; the first success wins and
/// partial results from different strategies are never blended within one
/// attempt. The trailing heuristic never fails, so a fully built chain always
/// produces a score. The deterministic fast-path signal is evaluated on every
/// call and merged with the chain result via [`merge_scores`].
pub struct StrategyChain {
    strategies: Vec<Arc<dyn ScoreStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn ScoreStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the chain from available API keys and the configured provider
    /// order, with the heuristic tail always appended.
    pub fn from_config(
        api_keys: &ApiKeys,
        provider_order: &[String],
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let mut strategies: Vec<Arc<dyn ScoreStrategy>> = Vec::new();

        for name in provider_order {
            let Some(provider) = Provider::parse(name) else {
                warn!(provider = %name, "Unknown provider in provider_order, skipping");
                continue;
            };
            let client: Option<Arc<dyn ScoringProvider>> = match provider {
                Provider::DeepSeek => api_keys
                    .deepseek
                    .as_ref()
                    .map(|k| Arc::new(DeepSeekScorer::new(k.clone())) as Arc<dyn ScoringProvider>),
                Provider::Gemini => api_keys
                    .gemini
                    .as_ref()
                    .map(|k| Arc::new(GeminiScorer::new(k.clone())) as Arc<dyn ScoringProvider>),
                Provider::Heuristic => None,
            };
            match client {
                Some(client) => {
                    strategies.push(Arc::new(ProviderStrategy::new(client, limiter.clone())));
                }
                None => debug!(provider = %provider, "Provider not configured, skipping"),
            }
        }

        strategies.push(Arc::new(HeuristicStrategy));

        let available: Vec<String> = strategies.iter().map(|s| s.provider_type().to_string()).collect();
        info!(chain = ?available, "Scoring strategy chain built");

        Self { strategies }
    }

    /// Score one category for an item. Never fails: all-strategy failure
    /// defaults the chain score to 0, and the fast-path merge still applies.
    pub async fn score(
        &self,
        content: &str,
        urls: &[String],
        category: &CategoryDefinition,
    ) -> u8 {
        let fast_path = fast_path_score(category, content, urls);

        for strategy in &self.strategies {
            match strategy.score(content, urls, category).await {
                Ok(score) => {
                    let merged = merge_scores(score.min(100), fast_path);
                    debug!(
                        category = %category.name,
                        provider = %strategy.provider_type(),
                        score,
                        fast_path = ?fast_path,
                        merged,
                        "Category scored"
                    );
                    return merged;
                }
                Err(e) => {
                    warn!(
                        category = %category.name,
                        provider = %strategy.provider_type(),
                        error = %e,
                        "Strategy failed, falling through"
                    );
                }
            }
        }

        merge_scores(0, fast_path)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
