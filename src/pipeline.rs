// src/pipeline.rs
// Auto-classify orchestrator: the composition root invoked fire-and-forget
// from the save path.

use crate::classifier::Classifier;
use crate::embeddings::EmbeddingGenerator;
use crate::store::ContentStore;
use crate::types::{ClassificationOutcome, ContentItem, TierAction};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates one classification + embedding round per saved item.
///
/// `process_note` detaches immediately: the save path never awaits or
/// depends on this pipeline, and every failure inside it terminates at a
/// logging sink. Confirmed assignments and suggestions share the adapter's
/// single write; the persisted confidence (the raw score) is what
/// distinguishes them downstream, and re-scoring an item is idempotent.
pub struct Pipeline {
    classifier: Arc<Classifier>,
    embedder: Option<Arc<EmbeddingGenerator>>,
    store: Arc<dyn ContentStore>,
}

impl Pipeline {
    pub fn new(
        classifier: Arc<Classifier>,
        embedder: Option<Arc<EmbeddingGenerator>>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            classifier,
            embedder,
            store,
        }
    }

    /// Fire-and-forget entry point. Returns control to the caller
    /// immediately; the spawned task holds no handle anyone awaits.
    pub fn process_note(self: Arc<Self>, item: ContentItem) {
        let pipeline = self;
        tokio::spawn(async move {
            let item_id = item.id;
            let outcome = pipeline.run(&item).await;
            if let Some(ref error) = outcome.error {
                warn!(item_id, error = %error, "Classification pipeline finished with errors");
            } else {
                debug!(
                    item_id,
                    confirmed = outcome.confirmed.len(),
                    suggested = outcome.suggested.len(),
                    embedded = outcome.embedding.is_some(),
                    "Classification pipeline finished"
                );
            }
        });
    }

    /// One full round: classifier and embedder run concurrently as
    /// independent failure domains, then the tier policy drives store writes.
    /// Never returns an error; failures are recorded on the outcome and
    /// logged.
    pub async fn run(&self, item: &ContentItem) -> ClassificationOutcome {
        let (scores, embedding) = tokio::join!(
            self.classifier.classify(&item.text, &item.urls),
            self.embed(&item.text)
        );

        let mut outcome = ClassificationOutcome::default();

        for result in scores {
            match result.action {
                TierAction::AutoConfirm => {
                    if self.persist_assignment(item.id, &result.category, result.score).await {
                        info!(
                            item_id = item.id,
                            category = %result.category,
                            score = result.score,
                            "Category auto-confirmed"
                        );
                        outcome.confirmed.push((result.category, result.score));
                    } else {
                        outcome.error = Some(format!("failed to persist '{}'", result.category));
                    }
                }
                TierAction::ShowSuggestion => {
                    if self.persist_assignment(item.id, &result.category, result.score).await {
                        outcome.suggested.push((result.category, result.score));
                    } else {
                        outcome.error = Some(format!("failed to persist '{}'", result.category));
                    }
                }
                TierAction::Skip => {}
            }
        }

        // Embedding persistence is independent of classification: a missing
        // vector is skipped silently.
        if let Some(vector) = embedding {
            match self.store.update_embedding(item.id, &vector).await {
                Ok(true) => outcome.embedding = Some(vector),
                Ok(false) => {
                    warn!(item_id = item.id, "Store rejected embedding update");
                }
                Err(e) => {
                    warn!(item_id = item.id, error = %e, "Embedding persistence failed");
                }
            }
        }

        outcome
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match &self.embedder {
            Some(embedder) => embedder.generate(text).await,
            None => None,
        }
    }

    /// Persist one assignment; logs and reports failure, never retries
    async fn persist_assignment(&self, item_id: i64, category: &str, score: u8) -> bool {
        match self
            .store
            .add_category_assignment(item_id, category, score, false)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(item_id, category, "Store rejected category assignment");
                false
            }
            Err(e) => {
                warn!(item_id, category, error = %e, "Assignment persistence failed");
                false
            }
        }
    }
}
