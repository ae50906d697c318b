// src/status.rs
// Deferred-visibility progress reporting, decoupled from whatever channel
// acknowledges the user. Generic over the delivery sink.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delivery channel for status messages. `post` creates a new user-visible
/// message, `replace` edits the last one this reporter posted.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn post(&self, text: &str) -> anyhow::Result<()>;
    async fn replace(&self, text: &str) -> anyhow::Result<()>;
}

/// Sink that terminates status updates in the log. Used by the CLI and as
/// the default sink for detached pipeline work.
pub struct LogSink;

#[async_trait]
impl StatusSink for LogSink {
    async fn post(&self, text: &str) -> anyhow::Result<()> {
        tracing::info!(status = %text, "status");
        Ok(())
    }
    async fn replace(&self, text: &str) -> anyhow::Result<()> {
        tracing::info!(status = %text, "status");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    /// Set synchronously by complete()/cancel() before any await. The
    /// deferred timer checks it first thing after firing and no-ops once set.
    completed: bool,
    /// The intermediate indicator became visible
    visible: bool,
}

struct Inner {
    kind: String,
    total_steps: Option<u32>,
    state: Mutex<ReporterState>,
    sink: Arc<dyn StatusSink>,
}

/// Factory for status handles over one sink
pub struct StatusReporter {
    sink: Arc<dyn StatusSink>,
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    /// Start tracking an operation. The intermediate indicator is only ever
    /// shown if the operation outlives `show_after`; a fast operation
    /// delivers nothing but its final result.
    pub fn start(
        &self,
        operation_kind: &str,
        total_steps: Option<u32>,
        show_after: Duration,
    ) -> StatusHandle {
        let inner = Arc::new(Inner {
            kind: operation_kind.to_string(),
            total_steps,
            state: Mutex::new(ReporterState::default()),
            sink: self.sink.clone(),
        });

        let timer_inner = inner.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(show_after).await;

            // Flag check and visibility flip are atomic: a complete() that
            // already ran wins, and one that runs later sees visible=true.
            {
                let Ok(mut state) = timer_inner.state.lock() else {
                    return;
                };
                if state.completed {
                    debug!(kind = %timer_inner.kind, "Operation finished before indicator, staying quiet");
                    return;
                }
                state.visible = true;
            }

            let text = match timer_inner.total_steps {
                Some(total) => format!("{}... (0/{})", timer_inner.kind, total),
                None => format!("{}...", timer_inner.kind),
            };
            if let Err(e) = timer_inner.sink.post(&text).await {
                warn!(error = %e, "Failed to post status indicator");
            }
        });

        StatusHandle { inner, timer }
    }
}

/// Handle for one tracked operation
pub struct StatusHandle {
    inner: Arc<Inner>,
    timer: JoinHandle<()>,
}

impl StatusHandle {
    /// Report a discrete step. No-op until the indicator is visible and
    /// after completion.
    pub async fn update(&self, step: u32) {
        {
            let Ok(state) = self.inner.state.lock() else {
                return;
            };
            if state.completed || !state.visible {
                return;
            }
        }

        let text = match self.inner.total_steps {
            Some(total) => format!("{}... ({}/{})", self.inner.kind, step, total),
            None => format!("{}... ({})", self.inner.kind, step),
        };
        if let Err(e) = self.inner.sink.replace(&text).await {
            warn!(error = %e, "Failed to update status indicator");
        }
    }

    /// Deliver the final result. The completed flag is set synchronously
    /// before any await, which is what prevents the double-delivery race
    /// with the deferred timer.
    pub async fn complete(self, final_result: &str) {
        let was_visible = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.completed {
                return;
            }
            state.completed = true;
            state.visible
        };

        let delivery = if was_visible {
            // The timer task may still be inside its indicator post; wait
            // for it to finish so the replacement targets a message that
            // actually exists
            let _ = self.timer.await;
            self.inner.sink.replace(final_result).await
        } else {
            self.timer.abort();
            self.inner.sink.post(final_result).await
        };
        if let Err(e) = delivery {
            warn!(error = %e, "Failed to deliver final status");
        }
    }

    /// Abandon the operation: nothing further is delivered.
    pub fn cancel(self) {
        {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.completed {
                return;
            }
            state.completed = true;
        }
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink recording every delivery for assertions
    #[derive(Default)]
    pub struct RecordingSink {
        pub ops: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn ops(&self) -> Vec<(String, String)> {
            self.ops.lock().unwrap().clone()
        }

        /// Count of messages posted as new (not in-place edits)
        fn posts(&self) -> usize {
            self.ops().iter().filter(|(op, _)| op == "post").count()
        }
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn post(&self, text: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(("post".into(), text.into()));
            Ok(())
        }
        async fn replace(&self, text: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(("replace".into(), text.into()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_shows_only_final_result() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = StatusReporter::new(sink.clone());

        let handle = reporter.start("classify", None, Duration::from_millis(500));
        handle.complete("done: 3 items").await;

        // The timer is dead; advancing past show_after must deliver nothing new
        tokio::time::sleep(Duration::from_secs(2)).await;

        let ops = sink.ops();
        assert_eq!(ops, vec![("post".to_string(), "done: 3 items".to_string())]);
        assert_eq!(sink.posts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_shows_indicator_then_replaces() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = StatusReporter::new(sink.clone());

        let handle = reporter.start("classify", Some(10), Duration::from_millis(500));

        // Outlive show_after: indicator becomes visible
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.update(4).await;
        handle.complete("done: 10 items").await;

        let ops = sink.ops();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], ("post".to_string(), "classify... (0/10)".to_string()));
        assert_eq!(ops[1], ("replace".to_string(), "classify... (4/10)".to_string()));
        assert_eq!(ops[2], ("replace".to_string(), "done: 10 items".to_string()));
        // Exactly one new message reached the user
        assert_eq!(sink.posts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_before_visibility_are_silent() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = StatusReporter::new(sink.clone());

        let handle = reporter.start("classify", Some(10), Duration::from_secs(5));
        handle.update(1).await;
        handle.update(2).await;
        handle.complete("done").await;

        assert_eq!(sink.ops(), vec![("post".to_string(), "done".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_delivers_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = StatusReporter::new(sink.clone());

        let handle = reporter.start("classify", None, Duration::from_millis(100));
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sink.ops().is_empty());
    }

    /// Sink whose posts park on a gate until the test releases them
    #[derive(Default)]
    struct GatedSink {
        ops: Mutex<Vec<(String, String)>>,
        gate: tokio::sync::Notify,
    }

    impl GatedSink {
        fn ops(&self) -> Vec<(String, String)> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSink for GatedSink {
        async fn post(&self, text: &str) -> anyhow::Result<()> {
            self.gate.notified().await;
            self.ops.lock().unwrap().push(("post".into(), text.into()));
            Ok(())
        }
        async fn replace(&self, text: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(("replace".into(), text.into()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_waits_for_in_flight_indicator_post() {
        let sink = Arc::new(GatedSink::default());
        let reporter = StatusReporter::new(sink.clone());
        let handle = reporter.start("classify", None, Duration::from_millis(100));

        // Cross show_after: the timer flips visibility and parks inside its
        // indicator post
        tokio::time::sleep(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;

        // complete() sees visible=true while the indicator delivery is still
        // in flight; it must wait for that post before replacing it
        let completer = tokio::spawn(async move { handle.complete("done").await });
        tokio::task::yield_now().await;
        sink.gate.notify_one();
        completer.await.unwrap();

        let ops = sink.ops();
        assert_eq!(
            ops,
            vec![
                ("post".to_string(), "classify...".to_string()),
                ("replace".to_string(), "done".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_firing_checks_flag_first() {
        let sink = Arc::new(RecordingSink::default());
        let reporter = StatusReporter::new(sink.clone());

        // Complete exactly at the show_after boundary: the flag is already
        // set when the timer callback runs, so it must no-op.
        let handle = reporter.start("classify", None, Duration::from_millis(100));
        handle.complete("fast result").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.posts(), 1);
        assert_eq!(sink.ops().len(), 1);
    }
}
