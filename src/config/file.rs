// src/config/file.rs
// File-based configuration from ~/.curator/config.toml

use crate::config::env::EnvOverrides;
use crate::types::CategoryDefinition;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level config structure
#[derive(Debug, Deserialize, Default)]
pub struct CuratorConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
}

/// Pipeline tuning section
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Minimum text length (chars) before an embedding is generated
    #[serde(default = "default_min_embed_chars")]
    pub min_embed_chars: usize,
    /// Embedding vector dimension, fixed per deployment
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

/// Interactive batch workflow section
#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    /// Shared timeout for the whole pending set
    #[serde(default = "default_batch_timeout_secs")]
    pub timeout_secs: u64,
    /// Fixed delay between items during a scoring pass (provider compliance)
    #[serde(default = "default_batch_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Default number of items fetched per run
    #[serde(default = "default_batch_size")]
    pub size: usize,
}

/// LLM section: strategy chain ordering
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// Provider names tried in order before the heuristic tail
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,
}

fn default_min_embed_chars() -> usize {
    20
}
fn default_embedding_dimensions() -> usize {
    768
}
fn default_batch_timeout_secs() -> u64 {
    300
}
fn default_batch_item_delay_ms() -> u64 {
    500
}
fn default_batch_size() -> usize {
    10
}
fn default_provider_order() -> Vec<String> {
    vec!["deepseek".into(), "gemini".into()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_embed_chars: default_min_embed_chars(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_batch_timeout_secs(),
            item_delay_ms: default_batch_item_delay_ms(),
            size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_order: default_provider_order(),
        }
    }
}

impl BatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

impl CuratorConfig {
    /// Load config from ~/.curator/config.toml, falling back to defaults.
    pub fn load() -> Self {
        let path = Self::config_path();

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(&EnvOverrides::from_env());
        config
    }

    /// Parse config from a TOML string (used by tests and the CLI --config flag)
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the config file path
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".curator")
            .join("config.toml")
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(chars) = overrides.min_embed_chars {
            self.pipeline.min_embed_chars = chars;
        }
        if let Some(secs) = overrides.batch_timeout_secs {
            self.batch.timeout_secs = secs;
        }
        if let Some(ms) = overrides.batch_item_delay_ms {
            self.batch.item_delay_ms = ms;
        }
    }

    /// Validate the loaded configuration. Called once at startup; a bad
    /// category definition is a configuration error, not a runtime fallback.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if let Err(msg) = category.validate() {
                bail!("{msg}");
            }
            if !seen.insert(category.name.as_str()) {
                bail!("duplicate category name '{}'", category.name);
            }
        }
        if self.pipeline.embedding_dimensions == 0 {
            bail!("embedding_dimensions must be positive");
        }
        if self.batch.timeout_secs == 0 {
            bail!("batch timeout_secs must be positive");
        }
        Ok(())
    }

    /// Enabled category definitions, in file order
    pub fn enabled_categories(&self) -> Vec<CategoryDefinition> {
        self.categories
            .iter()
            .filter(|c| c.enabled)
            .cloned()
            .collect()
    }
}
