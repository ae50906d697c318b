// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use tracing::{debug, warn};

/// API keys loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// DeepSeek API key (DEEPSEEK_API_KEY)
    pub deepseek: Option<String>,
    /// Gemini/Google API key (GEMINI_API_KEY or GOOGLE_API_KEY)
    pub gemini: Option<String>,
}

impl ApiKeys {
    /// Load API keys from environment variables.
    ///
    /// Set `CURATOR_DISABLE_LLM=1` to suppress all LLM keys, forcing the
    /// pipeline onto the deterministic heuristic chain tail.
    pub fn from_env() -> Self {
        if parse_bool_env("CURATOR_DISABLE_LLM").unwrap_or(false) {
            debug!("CURATOR_DISABLE_LLM is set, LLM providers disabled");
            return Self::default();
        }

        let keys = Self {
            deepseek: Self::read_key("DEEPSEEK_API_KEY"),
            gemini: Self::read_key("GEMINI_API_KEY").or_else(|| Self::read_key("GOOGLE_API_KEY")),
        };
        keys.log_status();
        keys
    }

    /// Read a single API key from environment, filtering empty values
    fn read_key(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|k| !k.trim().is_empty())
    }

    /// Check if any LLM scoring provider is available
    pub fn has_llm_provider(&self) -> bool {
        self.deepseek.is_some() || self.gemini.is_some()
    }

    /// Check if embeddings are available (requires Gemini key)
    pub fn has_embeddings(&self) -> bool {
        self.gemini.is_some()
    }

    /// Log which API keys are available (without exposing values)
    fn log_status(&self) {
        let mut available = Vec::new();
        if self.deepseek.is_some() {
            available.push("DeepSeek");
        }
        if self.gemini.is_some() {
            available.push("Gemini");
        }

        if available.is_empty() {
            warn!("No API keys configured - scoring falls back to heuristics only");
        } else {
            debug!(keys = ?available, "API keys loaded");
        }
    }
}

/// Numeric overrides for pipeline tuning. Each is optional; unset or
/// unparsable values fall back to the config-file defaults with a warning.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// Minimum text length for embedding (CURATOR_MIN_EMBED_CHARS)
    pub min_embed_chars: Option<usize>,
    /// Batch session timeout in seconds (CURATOR_BATCH_TIMEOUT_SECS)
    pub batch_timeout_secs: Option<u64>,
    /// Inter-item delay during batch scoring in ms (CURATOR_BATCH_ITEM_DELAY_MS)
    pub batch_item_delay_ms: Option<u64>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            min_embed_chars: parse_num_env("CURATOR_MIN_EMBED_CHARS"),
            batch_timeout_secs: parse_num_env("CURATOR_BATCH_TIMEOUT_SECS"),
            batch_item_delay_ms: parse_num_env("CURATOR_BATCH_ITEM_DELAY_MS"),
        }
    }
}

/// Parse a boolean environment variable ("1", "true", "yes" are truthy)
pub fn parse_bool_env(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        other => {
            warn!(var = name, value = other, "Unrecognized boolean value, ignoring");
            None
        }
    }
}

/// Parse a numeric environment variable, warning on garbage instead of failing
fn parse_num_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(var = name, value = %value, "Unparsable numeric value, using default");
            None
        }
    }
}
