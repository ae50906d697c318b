// src/scoring/heuristic.rs
// Deterministic pattern heuristic: chain tail that never fails, plus the
// always-evaluated fast-path signal.

use crate::llm::Provider;
use crate::scoring::ScoreStrategy;
use crate::types::CategoryDefinition;
use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;
use url::Url;

/// Score for an exact URL-domain signal match
const DOMAIN_SIGNAL_SCORE: u8 = 92;
/// Score for a dominant Unicode-script signal
const SCRIPT_SIGNAL_SCORE: u8 = 85;
/// Score for a regex pattern signal match
const PATTERN_SIGNAL_SCORE: u8 = 75;

/// Minimum fraction of alphabetic characters that must belong to a script
/// before the script signal fires
const SCRIPT_FRACTION: f64 = 0.25;

/// Deterministic signal score for a category, if any signal fires.
///
/// This is the fast-path: cheap, always evaluated alongside the strategy
/// chain, and merged with the chain result by max. Categories without signal
/// configuration never produce a fast-path score.
pub fn fast_path_score(category: &CategoryDefinition, content: &str, urls: &[String]) -> Option<u8> {
    let mut best: Option<u8> = None;
    let mut bump = |score: u8| best = Some(best.map_or(score, |b: u8| b.max(score)));

    if matches_domain(&category.signal_domains, urls) {
        bump(DOMAIN_SIGNAL_SCORE);
    }
    if matches_script(&category.signal_scripts, content) {
        bump(SCRIPT_SIGNAL_SCORE);
    }
    if matches_pattern(&category.signal_patterns, content) {
        bump(PATTERN_SIGNAL_SCORE);
    }

    best
}

/// Chain tail: same deterministic signals, but as an infallible strategy.
/// No signal configured or matched scores 0 rather than erroring, so a fully
/// built chain always terminates with a result.
pub struct HeuristicStrategy;

#[async_trait]
impl ScoreStrategy for HeuristicStrategy {
    async fn score(
        &self,
        content: &str,
        urls: &[String],
        category: &CategoryDefinition,
    ) -> Result<u8> {
        Ok(fast_path_score(category, content, urls).unwrap_or(0))
    }

    fn provider_type(&self) -> Provider {
        Provider::Heuristic
    }
}

/// Does any item URL's host match one of the category's domain suffixes?
fn matches_domain(domains: &[String], urls: &[String]) -> bool {
    if domains.is_empty() {
        return false;
    }
    urls.iter()
        .filter_map(|u| Url::parse(u).ok())
        .filter_map(|u| u.host_str().map(|h| h.to_lowercase()))
        .any(|host| {
            domains.iter().any(|d| {
                let d = d.to_lowercase();
                host == d || host.ends_with(&format!(".{d}"))
            })
        })
}

/// Does any configured regex match the content?
fn matches_pattern(patterns: &[String], content: &str) -> bool {
    patterns.iter().any(|p| match regex::Regex::new(p) {
        Ok(re) => re.is_match(content),
        Err(e) => {
            warn!(pattern = %p, error = %e, "Invalid signal pattern, skipping");
            false
        }
    })
}

/// Is a named script dominant in the content's alphabetic characters?
fn matches_script(scripts: &[String], content: &str) -> bool {
    if scripts.is_empty() {
        return false;
    }
    let alphabetic: Vec<char> = content.chars().filter(|c| c.is_alphabetic()).collect();
    if alphabetic.is_empty() {
        return false;
    }

    scripts.iter().any(|name| {
        let in_script = alphabetic
            .iter()
            .filter(|&&c| char_in_script(c, name))
            .count();
        in_script as f64 / alphabetic.len() as f64 >= SCRIPT_FRACTION
    })
}

/// Membership check for the script names the config accepts
fn char_in_script(c: char, script: &str) -> bool {
    let code = c as u32;
    match script.to_lowercase().as_str() {
        "cyrillic" => (0x0400..=0x04FF).contains(&code) || (0x0500..=0x052F).contains(&code),
        "cjk" => {
            (0x4E00..=0x9FFF).contains(&code)        // CJK unified
                || (0x3040..=0x30FF).contains(&code) // Hiragana + Katakana
                || (0x3400..=0x4DBF).contains(&code)
        }
        "hangul" => (0xAC00..=0xD7AF).contains(&code) || (0x1100..=0x11FF).contains(&code),
        "arabic" => (0x0600..=0x06FF).contains(&code) || (0x0750..=0x077F).contains(&code),
        "hebrew" => (0x0590..=0x05FF).contains(&code),
        "greek" => (0x0370..=0x03FF).contains(&code),
        other => {
            warn!(script = other, "Unknown signal script name");
            false
        }
    }
}
