// src/llm/mod.rs
// Scoring provider abstraction and clients

mod deepseek;
mod gemini;
pub mod http;

pub use deepseek::DeepSeekScorer;
pub use gemini::GeminiScorer;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scoring provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    DeepSeek,
    Gemini,
    /// Deterministic pattern heuristic, always available
    Heuristic,
}

impl Provider {
    /// Parse provider from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Some(Self::DeepSeek),
            "gemini" => Some(Self::Gemini),
            "heuristic" => Some(Self::Heuristic),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::Gemini => write!(f, "gemini"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Trait for LLM scoring clients. One rendered prompt in, raw model text out;
/// numeric parsing and coercion happen in the caller so every provider gets
/// identical treatment of malformed output.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Send one rendered scoring prompt and return the raw response text
    async fn score(&self, prompt: &str) -> Result<String>;

    /// Get the provider type
    fn provider_type(&self) -> Provider;

    /// Model identifier for logging
    fn model_name(&self) -> String;
}

/// Parse a raw model response into a score in [0, 100].
///
/// Takes the first integer found in the text and clamps it to 100; anything
/// unparsable coerces to 0 rather than failing the scoring round.
pub fn parse_score(raw: &str) -> u8 {
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            if digits.len() >= 3 {
                break;
            }
        } else if !digits.is_empty() {
            break;
        }
    }
    match digits.parse::<u32>() {
        Ok(n) => n.min(100) as u8,
        Err(_) => {
            tracing::warn!(raw = %raw.chars().take(80).collect::<String>(), "Unparsable score response, coercing to 0");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_score("87"), 87);
        assert_eq!(parse_score("  42\n"), 42);
        assert_eq!(parse_score("0"), 0);
        assert_eq!(parse_score("100"), 100);
    }

    #[test]
    fn test_parse_number_with_prose() {
        assert_eq!(parse_score("Score: 73"), 73);
        assert_eq!(parse_score("I'd rate this 55 out of 100."), 55);
        assert_eq!(parse_score("**90**"), 90);
    }

    #[test]
    fn test_parse_clamps_overflow() {
        assert_eq!(parse_score("250"), 100);
        assert_eq!(parse_score("999999"), 100);
    }

    #[test]
    fn test_parse_garbage_coerces_to_zero() {
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score("no idea"), 0);
        assert_eq!(parse_score("N/A"), 0);
    }

    #[test]
    fn test_provider_parse_round_trip() {
        for p in [Provider::DeepSeek, Provider::Gemini, Provider::Heuristic] {
            assert_eq!(Provider::parse(&p.to_string()), Some(p));
        }
        assert_eq!(Provider::parse("openai"), None);
    }
}
