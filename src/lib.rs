// src/lib.rs
// Curator: classification and embedding pipeline for personal content capture

pub mod batch;
pub mod classifier;
pub mod config;
pub mod embeddings;
pub mod limiter;
pub mod llm;
pub mod pipeline;
pub mod scoring;
pub mod status;
pub mod store;
pub mod types;

pub use batch::{BatchClassifier, BatchError, BatchState};
pub use classifier::Classifier;
pub use embeddings::EmbeddingGenerator;
pub use limiter::RateLimiter;
pub use pipeline::Pipeline;
pub use scoring::StrategyChain;
pub use status::{LogSink, StatusReporter, StatusSink};
pub use store::ContentStore;
pub use types::{BatchSummary, CategoryDefinition, ClassificationOutcome, ContentItem, ScoreResult};
