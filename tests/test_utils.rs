// tests/test_utils.rs
// Shared fixtures for integration tests: scripted strategies, recording
// sinks, and pre-wired classifiers over the in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use curator::embeddings::EmbeddingProvider;
use curator::llm::Provider;
use curator::scoring::{ScoreStrategy, StrategyChain};
use curator::status::StatusSink;
use curator::store::{ContentStore, MemoryStore};
use curator::types::{CategoryDefinition, ContentItem};
use curator::Classifier;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Strategy returning a fixed score per category name; unknown names fail
/// like a provider error would.
pub struct ScriptedStrategy {
    scores: HashMap<String, u8>,
    /// Artificial latency per call, for non-blocking contract tests
    pub delay: Duration,
}

impl ScriptedStrategy {
    pub fn new(scores: &[(&str, u8)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(name, score)| (name.to_string(), *score))
                .collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ScoreStrategy for ScriptedStrategy {
    async fn score(
        &self,
        _content: &str,
        _urls: &[String],
        category: &CategoryDefinition,
    ) -> Result<u8> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.scores.get(&category.name) {
            Some(score) => Ok(*score),
            None => anyhow::bail!("provider error for category '{}'", category.name),
        }
    }

    fn provider_type(&self) -> Provider {
        Provider::DeepSeek
    }
}

/// Embedding provider producing a constant vector
pub struct FixedEmbeddings {
    pub dims: usize,
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; self.dims])
    }
    fn dimensions(&self) -> usize {
        self.dims
    }
    fn model_name(&self) -> String {
        "fixed".into()
    }
}

/// Store wrapper that yields once per call, like any real backend would
pub struct YieldingStore {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl ContentStore for YieldingStore {
    async fn add_category_assignment(
        &self,
        item_id: i64,
        category: &str,
        confidence: u8,
        user_confirmed: bool,
    ) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner
            .add_category_assignment(item_id, category, confidence, user_confirmed)
            .await
    }

    async fn update_embedding(&self, item_id: i64, vector: &[f32]) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner.update_embedding(item_id, vector).await
    }

    async fn fetch_unclassified_items(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        tokio::task::yield_now().await;
        self.inner.fetch_unclassified_items(owner_id, limit).await
    }
}

/// Status sink recording every delivery
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn post(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
    async fn replace(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Standard two-category setup: todo (95/60) and idea (90/50)
pub fn categories() -> Vec<CategoryDefinition> {
    vec![category("todo", 95, 60), category("idea", 90, 50)]
}

pub fn category(name: &str, auto_confirm: u8, suggest: u8) -> CategoryDefinition {
    CategoryDefinition {
        name: name.into(),
        prompt: "Rate 0-100: {content} ({urls})".into(),
        auto_confirm,
        suggest,
        enabled: true,
        signal_domains: vec![],
        signal_patterns: vec![],
        signal_scripts: vec![],
    }
}

/// Classifier over a single scripted strategy
pub fn classifier_with(
    strategy: ScriptedStrategy,
    categories: Vec<CategoryDefinition>,
) -> Arc<Classifier> {
    let chain = Arc::new(StrategyChain::new(vec![
        Arc::new(strategy) as Arc<dyn ScoreStrategy>
    ]));
    Arc::new(Classifier::new(chain, categories))
}
