// src/batch.rs
// Interactive batch classification: fetch -> score -> auto-confirm high
// scores -> hold the rest pending behind opaque tokens -> one shared timeout.

use crate::classifier::Classifier;
use crate::config::BatchConfig;
use crate::status::{StatusReporter, StatusSink};
use crate::store::ContentStore;
use crate::types::{BatchSummary, ContentItem, ScoreResult, TierAction};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Length of the opaque tokens handed to the interactive channel
const TOKEN_LEN: usize = 8;

/// How long a scoring pass runs before the progress indicator appears
const SHOW_PROGRESS_AFTER: Duration = Duration::from_secs(2);

/// Probe limit when counting what is still unclassified for the summary
const REMAINING_PROBE_LIMIT: usize = 500;

/// Confidence recorded for an explicit user choice
const USER_CONFIRMED_SCORE: u8 = 100;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no batch classification is waiting for input")]
    NoActiveSession,
    #[error("unknown or expired token '{0}'")]
    UnknownToken(String),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Scoring,
    AwaitingUserInput,
    Resolved,
}

/// An item held for user resolution, keyed by its session-scoped token
#[derive(Debug, Clone)]
pub struct PendingBatchItem {
    pub token: String,
    pub item: ContentItem,
    pub scores: Vec<ScoreResult>,
}

impl PendingBatchItem {
    /// The item's highest-scoring category, used for timeout auto-assignment
    fn top_category(&self) -> Option<&ScoreResult> {
        self.scores.iter().max_by_key(|s| s.score)
    }
}

/// One batch run. Owns the pending map, the token registry, and the single
/// shared timer; replaced wholesale when a new run starts.
struct BatchSession {
    id: Uuid,
    owner_id: i64,
    state: BatchState,
    pending: HashMap<String, PendingBatchItem>,
    timer: Option<JoinHandle<()>>,
    summary: BatchSummary,
}

impl BatchSession {
    fn new(owner_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            state: BatchState::Scoring,
            pending: HashMap::new(),
            timer: None,
            summary: BatchSummary::default(),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// The `/classify`-style interactive workflow. At most one session is active;
/// starting a new one cancels and discards the previous session's timer and
/// pending map. Tokens are scoped to the active session and lookups after it
/// ends fail safely.
pub struct BatchClassifier {
    classifier: Arc<Classifier>,
    store: Arc<dyn ContentStore>,
    config: BatchConfig,
    sink: Arc<dyn StatusSink>,
    session: Mutex<Option<BatchSession>>,
}

impl BatchClassifier {
    pub fn new(
        classifier: Arc<Classifier>,
        store: Arc<dyn ContentStore>,
        config: BatchConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            classifier,
            store,
            config,
            sink,
            session: Mutex::new(None),
        }
    }

    /// Fire-and-forget entry point for the interactive command collaborator.
    pub fn run_batch_classification(self: Arc<Self>, owner_id: i64, batch_size: usize) {
        tokio::spawn(async move {
            self.run(owner_id, batch_size).await;
        });
    }

    /// Current session state, `Idle` when none is active
    pub async fn state(&self) -> BatchState {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(BatchState::Idle, |s| s.state)
    }

    /// Pending tokens of the active session (diagnostics and tests)
    pub async fn pending_tokens(&self) -> Vec<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.pending.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Start (or restart) a batch run and drive it through the scoring phase.
    /// Returns once scoring is done; resolution continues via user choices or
    /// the session timer.
    pub async fn run(self: Arc<Self>, owner_id: i64, batch_size: usize) {
        let batch_size = if batch_size == 0 {
            self.config.size
        } else {
            batch_size
        };

        // Replace any prior session: its timer and pending map are discarded.
        let session_id = {
            let mut guard = self.session.lock().await;
            if let Some(mut old) = guard.take() {
                old.cancel_timer();
                info!(session = %old.id, state = ?old.state, "Discarding previous batch session");
            }
            let session = BatchSession::new(owner_id);
            let id = session.id;
            *guard = Some(session);
            id
        };

        let items = match self.store.fetch_unclassified_items(owner_id, batch_size).await {
            Ok(items) => items,
            Err(e) => {
                warn!(owner_id, error = %e, "Failed to fetch unclassified items");
                self.resolve(session_id, "could not load unclassified items")
                    .await;
                return;
            }
        };

        if items.is_empty() {
            self.resolve(session_id, "nothing left to classify").await;
            return;
        }

        info!(session = %session_id, count = items.len(), "Batch scoring started");
        let reporter = StatusReporter::new(self.sink.clone());
        let progress = reporter.start("classifying", Some(items.len() as u32), SHOW_PROGRESS_AFTER);

        for (index, item) in items.into_iter().enumerate() {
            // Serialize across items with a fixed delay to stay under
            // provider rate ceilings during a multi-item pass.
            if index > 0 {
                tokio::time::sleep(self.config.item_delay()).await;
            }

            let item_id = item.id;
            let scores = self.classifier.classify(&item.text, &item.urls).await;

            // The session may have been replaced while we were scoring;
            // re-validate before touching its state, and never hold the lock
            // across the store or progress awaits below.
            let to_confirm: Vec<ScoreResult> = {
                let mut guard = self.session.lock().await;
                let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
                    debug!(session = %session_id, "Session superseded mid-scoring, abandoning run");
                    progress.cancel();
                    return;
                };

                let confirmable: Vec<ScoreResult> = scores
                    .iter()
                    .filter(|s| s.action == TierAction::AutoConfirm)
                    .cloned()
                    .collect();

                if scores.is_empty() {
                    session.summary.failed += 1;
                } else if confirmable.is_empty() {
                    // Held for the user under a fresh opaque token
                    let token = mint_token(&session.pending);
                    session.pending.insert(
                        token.clone(),
                        PendingBatchItem {
                            token,
                            item,
                            scores,
                        },
                    );
                }
                confirmable
            };

            if !to_confirm.is_empty() {
                let mut any_persisted = false;
                let mut any_failed = false;
                for score in &to_confirm {
                    if self
                        .persist(item_id, &score.category, score.score, false)
                        .await
                    {
                        any_persisted = true;
                    } else {
                        any_failed = true;
                    }
                }
                let mut guard = self.session.lock().await;
                if let Some(session) = guard.as_mut().filter(|s| s.id == session_id) {
                    if any_persisted {
                        session.summary.auto_confirmed += 1;
                    } else if any_failed {
                        session.summary.failed += 1;
                    }
                }
            }

            progress.update(index as u32 + 1).await;
        }

        // Scoring finished: either everything resolved already, or the
        // pending set waits behind the single shared timer.
        let pending_count = {
            let mut guard = self.session.lock().await;
            let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
                progress.cancel();
                return;
            };
            if session.pending.is_empty() {
                0
            } else {
                session.state = BatchState::AwaitingUserInput;
                let timeout = self.config.timeout();
                let batch = self.clone();
                session.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    batch.expire(session_id).await;
                }));
                session.pending.len()
            }
        };

        if pending_count == 0 {
            progress.cancel();
            self.resolve(session_id, "").await;
        } else {
            progress
                .complete(&format!(
                    "{pending_count} item(s) need your choice (auto-resolving in {}s)",
                    self.config.timeout_secs
                ))
                .await;
        }
    }

    /// Resolve one pending item by explicit user choice. The chosen category
    /// is persisted at maximum confidence with `user_confirmed = true`.
    pub async fn handle_user_category_choice(
        &self,
        token: &str,
        category: &str,
    ) -> Result<(), BatchError> {
        if self.classifier.category(category).is_none() {
            return Err(BatchError::UnknownCategory(category.to_string()));
        }

        let (session_id, entry) = {
            let mut guard = self.session.lock().await;
            let session = guard
                .as_mut()
                .filter(|s| s.state == BatchState::AwaitingUserInput)
                .ok_or(BatchError::NoActiveSession)?;
            let entry = session
                .pending
                .remove(token)
                .ok_or_else(|| BatchError::UnknownToken(token.to_string()))?;
            (session.id, entry)
        };

        let persisted = self
            .persist(entry.item.id, category, USER_CONFIRMED_SCORE, true)
            .await;

        // Re-validate: the session may have been replaced or expired while
        // the store write was in flight.
        let now_empty = {
            let mut guard = self.session.lock().await;
            let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
                return Ok(());
            };
            if persisted {
                session.summary.manually_confirmed += 1;
                info!(
                    session = %session_id,
                    item_id = entry.item.id,
                    category,
                    "Category confirmed by user"
                );
            } else {
                session.summary.failed += 1;
            }
            if session.pending.is_empty() {
                session.cancel_timer();
                true
            } else {
                false
            }
        };

        if now_empty {
            self.resolve(session_id, "").await;
        }
        Ok(())
    }

    /// Shared-timer expiry: every remaining pending item is auto-assigned
    /// its own highest-scoring category with `user_confirmed = false`.
    async fn expire(&self, session_id: Uuid) {
        let drained: Vec<PendingBatchItem> = {
            let mut guard = self.session.lock().await;
            let Some(session) = guard
                .as_mut()
                .filter(|s| s.id == session_id && s.state == BatchState::AwaitingUserInput)
            else {
                return;
            };
            // Expiry runs on the timer task itself: drop the handle here,
            // never abort it, or the abort would kill this task at its next
            // yield point before the summary is delivered
            session.timer.take();
            session.pending.drain().map(|(_, v)| v).collect()
        };

        info!(session = %session_id, count = drained.len(), "Batch timeout, auto-assigning remainder");

        let mut assigned = 0usize;
        let mut failed = 0usize;
        for entry in drained {
            match entry.top_category() {
                Some(top) => {
                    if self.persist(entry.item.id, &top.category, top.score, false).await {
                        assigned += 1;
                    } else {
                        failed += 1;
                    }
                }
                None => failed += 1,
            }
        }

        {
            let mut guard = self.session.lock().await;
            if let Some(session) = guard.as_mut().filter(|s| s.id == session_id) {
                session.summary.auto_assigned += assigned;
                session.summary.failed += failed;
            }
        }

        self.resolve(session_id, "").await;
    }

    /// Move the session to Resolved and surface the summary line. This is
    /// the only place batch failures become user-visible.
    async fn resolve(&self, session_id: Uuid, note: &str) {
        let (owner_id, mut summary) = {
            let mut guard = self.session.lock().await;
            let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
                return;
            };
            session.cancel_timer();
            session.state = BatchState::Resolved;
            (session.owner_id, session.summary)
        };

        summary.remaining_unclassified = self
            .store
            .fetch_unclassified_items(owner_id, REMAINING_PROBE_LIMIT)
            .await
            .map(|items| items.len())
            .unwrap_or(0);

        // Store the final counts back for introspection before the session
        // object is eventually discarded by the next start.
        {
            let mut guard = self.session.lock().await;
            if let Some(session) = guard.as_mut().filter(|s| s.id == session_id) {
                session.summary = summary;
            }
        }

        let line = if note.is_empty() {
            summary.to_string()
        } else {
            format!("{note}; {summary}")
        };
        info!(session = %session_id, summary = %line, "Batch session resolved");
        if let Err(e) = self.sink.post(&line).await {
            warn!(error = %e, "Failed to deliver batch summary");
        }
    }

    /// The active session's summary so far (final once Resolved)
    pub async fn summary(&self) -> Option<BatchSummary> {
        self.session.lock().await.as_ref().map(|s| s.summary)
    }

    async fn persist(&self, item_id: i64, category: &str, confidence: u8, user_confirmed: bool) -> bool {
        match self
            .store
            .add_category_assignment(item_id, category, confidence, user_confirmed)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(item_id, category, "Store rejected batch assignment");
                false
            }
            Err(e) => {
                warn!(item_id, category, error = %e, "Batch assignment persistence failed");
                false
            }
        }
    }
}

/// Mint a short opaque token unique within the session's pending map
fn mint_token(pending: &HashMap<String, PendingBatchItem>) -> String {
    loop {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        if !pending.contains_key(&token) {
            return token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_token_shape_and_uniqueness() {
        let pending = HashMap::new();
        let a = mint_token(&pending);
        let b = mint_token(&pending);
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_top_category_picks_highest() {
        use crate::types::{CategoryDefinition, ItemKind};
        let def = |name: &str, auto: u8, sug: u8| CategoryDefinition {
            name: name.into(),
            prompt: "{content}".into(),
            auto_confirm: auto,
            suggest: sug,
            enabled: true,
            signal_domains: vec![],
            signal_patterns: vec![],
            signal_scripts: vec![],
        };
        let entry = PendingBatchItem {
            token: "tok".into(),
            item: ContentItem::new(1, 7, ItemKind::Note, "x"),
            scores: vec![
                ScoreResult::new(&def("idea", 95, 60), 40),
                ScoreResult::new(&def("todo", 95, 60), 72),
                ScoreResult::new(&def("quote", 95, 60), 15),
            ],
        };
        assert_eq!(entry.top_category().unwrap().category, "todo");
    }
}
