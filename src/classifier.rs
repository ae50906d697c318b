// src/classifier.rs
// Concurrent per-category classification

use crate::scoring::StrategyChain;
use crate::types::{CategoryDefinition, ScoreResult};
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

/// Runs every enabled category through the strategy chain concurrently.
///
/// Fan-out is bounded by the category count (typically 4-8). Each category is
/// an independent failure domain: the chain already converts strategy failure
/// to a 0 score, so one category can never cancel or block the others.
pub struct Classifier {
    chain: Arc<StrategyChain>,
    categories: Vec<CategoryDefinition>,
}

impl Classifier {
    /// Build a classifier over the enabled subset of the given categories
    pub fn new(chain: Arc<StrategyChain>, categories: Vec<CategoryDefinition>) -> Self {
        let categories = categories.into_iter().filter(|c| c.enabled).collect();
        Self { chain, categories }
    }

    /// The enabled category definitions
    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    /// Look up an enabled category by name
    pub fn category(&self, name: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Score an item against every enabled category, concurrently.
    /// Returns one [`ScoreResult`] per enabled category.
    pub async fn classify(&self, content: &str, urls: &[String]) -> Vec<ScoreResult> {
        let evaluations = self.categories.iter().map(|category| async move {
            let score = self.chain.score(content, urls, category).await;
            ScoreResult::new(category, score)
        });

        let results = join_all(evaluations).await;
        debug!(
            categories = results.len(),
            "Classification round complete"
        );
        results
    }
}
