// src/embeddings/mod.rs
// Embedding provider module

mod gemini;

pub use gemini::GeminiEmbeddings;

use crate::config::{ApiKeys, PipelineConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for embedding clients: one text in, one fixed-dimension vector out.
/// Kept separate from scoring so the two failure domains stay independent.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The vector dimension this provider produces (fixed per deployment)
    fn dimensions(&self) -> usize;

    /// Model identifier for logging
    fn model_name(&self) -> String;
}

/// Length-gated embedding generation for the pipeline.
///
/// Skips trivial content entirely and converts provider failure to an
/// explicit "no embedding" result. Nothing here ever propagates an error:
/// classification persistence must not depend on the embedding path.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    min_chars: usize,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, min_chars: usize) -> Self {
        Self { provider, min_chars }
    }

    /// Build from configuration; `None` when no embedding key is present.
    pub fn from_config(api_keys: &ApiKeys, config: &PipelineConfig) -> Option<Self> {
        let api_key = api_keys.gemini.as_ref()?;
        let provider = Arc::new(GeminiEmbeddings::new(
            api_key.clone(),
            config.embedding_dimensions,
        ));
        Some(Self::new(provider, config.min_embed_chars))
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Generate an embedding for the item text, or `None` when the text is
    /// below the minimum length or the provider call fails.
    pub async fn generate(&self, text: &str) -> Option<Vec<f32>> {
        let chars = text.chars().count();
        if chars < self.min_chars {
            debug!(chars, min = self.min_chars, "Text below embedding minimum, skipping");
            return None;
        }

        match self.provider.embed(text).await {
            Ok(vector) => {
                if vector.len() != self.provider.dimensions() {
                    warn!(
                        got = vector.len(),
                        expected = self.provider.dimensions(),
                        "Embedding dimension mismatch, discarding"
                    );
                    return None;
                }
                Some(vector)
            }
            Err(e) => {
                warn!(error = %e, "Embedding generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEmbeddings {
        dims: usize,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("embedding quota exceeded")
            }
            Ok(vec![0.5; self.dims])
        }
        fn dimensions(&self) -> usize {
            self.dims
        }
        fn model_name(&self) -> String {
            "fake".into()
        }
    }

    #[tokio::test]
    async fn test_short_text_is_skipped_without_a_call() {
        let provider = Arc::new(FakeEmbeddings {
            dims: 4,
            fail: false,
            calls: AtomicUsize::new(0),
        });
        let generator = EmbeddingGenerator::new(provider.clone(), 20);

        // content length 10, minimum 20 -> no provider call at all
        assert!(generator.generate("ten chars!").await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_text_is_embedded() {
        let provider = Arc::new(FakeEmbeddings {
            dims: 4,
            fail: false,
            calls: AtomicUsize::new(0),
        });
        let generator = EmbeddingGenerator::new(provider, 20);
        let vector = generator
            .generate("this text is comfortably past the minimum")
            .await;
        assert_eq!(vector, Some(vec![0.5; 4]));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_none() {
        let provider = Arc::new(FakeEmbeddings {
            dims: 4,
            fail: true,
            calls: AtomicUsize::new(0),
        });
        let generator = EmbeddingGenerator::new(provider, 0);
        assert!(generator.generate("long enough text here").await.is_none());
    }

    #[tokio::test]
    async fn test_no_key_means_no_generator() {
        let config = PipelineConfig::default();
        assert!(EmbeddingGenerator::from_config(&ApiKeys::default(), &config).is_none());
    }
}
