// src/types.rs
// Core data model: content items, category definitions, score tiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of captured content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Note,
    Link,
    Document,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Note => "note",
            ItemKind::Link => "link",
            ItemKind::Document => "document",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A captured content item. Immutable input to the pipeline — created by the
/// save path, never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub owner_id: i64,
    pub kind: ItemKind,
    pub text: String,
    #[serde(default)]
    pub urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(id: i64, owner_id: i64, kind: ItemKind, text: impl Into<String>) -> Self {
        Self {
            id,
            owner_id,
            kind,
            text: text.into(),
            urls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }
}

/// A category the pipeline can assign, loaded from configuration.
///
/// `prompt` is a template with `{content}` and `{urls}` placeholders.
/// The optional `signal_*` fields feed the deterministic heuristic and
/// fast-path: URL host suffixes, regex patterns, and named Unicode scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub prompt: String,
    pub auto_confirm: u8,
    pub suggest: u8,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub signal_domains: Vec<String>,
    #[serde(default)]
    pub signal_patterns: Vec<String>,
    #[serde(default)]
    pub signal_scripts: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl CategoryDefinition {
    /// Render the scoring prompt for an item by template substitution.
    pub fn render_prompt(&self, content: &str, urls: &[String]) -> String {
        self.prompt
            .replace("{content}", content)
            .replace("{urls}", &urls.join(", "))
    }

    /// Check threshold invariants: auto_confirm >= suggest, both in [0, 100].
    pub fn validate(&self) -> Result<(), String> {
        if self.auto_confirm > 100 || self.suggest > 100 {
            return Err(format!(
                "category '{}': thresholds must be in [0, 100] (auto_confirm={}, suggest={})",
                self.name, self.auto_confirm, self.suggest
            ));
        }
        if self.auto_confirm < self.suggest {
            return Err(format!(
                "category '{}': auto_confirm ({}) must be >= suggest ({})",
                self.name, self.auto_confirm, self.suggest
            ));
        }
        Ok(())
    }
}

/// Confidence tier for a score. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Definite,
    High,
    Moderate,
    Low,
    Insufficient,
}

impl Tier {
    /// Map a score onto a tier given the category thresholds.
    ///
    /// The buckets are half-open and partition [0, 100]:
    /// `[0, suggest/2)` Insufficient, `[suggest/2, suggest)` Low,
    /// `[suggest, mid)` Moderate, `[mid, auto_confirm)` High,
    /// `[auto_confirm, 100]` Definite, where
    /// `mid = suggest + (auto_confirm - suggest) / 2`.
    pub fn derive(score: u8, auto_confirm: u8, suggest: u8) -> Self {
        let mid = suggest + (auto_confirm.saturating_sub(suggest)) / 2;
        if score >= auto_confirm {
            Tier::Definite
        } else if score >= mid {
            Tier::High
        } else if score >= suggest {
            Tier::Moderate
        } else if score >= suggest / 2 {
            Tier::Low
        } else {
            Tier::Insufficient
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Definite => "definite",
            Tier::High => "high",
            Tier::Moderate => "moderate",
            Tier::Low => "low",
            Tier::Insufficient => "insufficient",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the orchestrator does with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAction {
    AutoConfirm,
    ShowSuggestion,
    Skip,
}

impl TierAction {
    /// Pure decision function of (score, thresholds).
    pub fn derive(score: u8, auto_confirm: u8, suggest: u8) -> Self {
        if score >= auto_confirm {
            TierAction::AutoConfirm
        } else if score >= suggest {
            TierAction::ShowSuggestion
        } else {
            TierAction::Skip
        }
    }
}

/// One category's score for one item, with derived tier and action.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub category: String,
    pub score: u8,
    pub tier: Tier,
    pub action: TierAction,
}

impl ScoreResult {
    pub fn new(def: &CategoryDefinition, score: u8) -> Self {
        let score = score.min(100);
        Self {
            category: def.name.clone(),
            score,
            tier: Tier::derive(score, def.auto_confirm, def.suggest),
            action: TierAction::derive(score, def.auto_confirm, def.suggest),
        }
    }
}

/// Result of one orchestrator invocation. Consumed to drive store calls,
/// never persisted itself.
#[derive(Debug, Clone, Default)]
pub struct ClassificationOutcome {
    pub confirmed: Vec<(String, u8)>,
    pub suggested: Vec<(String, u8)>,
    pub embedding: Option<Vec<f32>>,
    pub error: Option<String>,
}

/// Summary of a resolved batch classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub auto_confirmed: usize,
    pub manually_confirmed: usize,
    pub auto_assigned: usize,
    pub failed: usize,
    pub remaining_unclassified: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} auto-confirmed, {} confirmed by you, {} auto-assigned, {} failed, {} still unclassified",
            self.auto_confirmed,
            self.manually_confirmed,
            self.auto_assigned,
            self.failed,
            self.remaining_unclassified
        )
    }
}
