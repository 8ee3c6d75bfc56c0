//! Punishment sweep.
//!
//! A background loop wakes on a fixed interval, scans the store for tasks
//! whose deadline passed without completion, and posts a shame webhook for
//! each. A task is marked punished only after its notification was
//! accepted, and the flag write re-checks eligibility so a task completed
//! while the delivery was in flight stays unpunished. Failed deliveries are
//! simply retried on later ticks; there is no backoff and no retry cap.

use crate::db::{Database, now_ms};
use crate::notify::NotificationSink;
use crate::types::Task;
use chrono::DateTime;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sweep settings, injected at construction so tests can run sweeps
/// without touching process-wide state.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between ticks.
    pub interval: std::time::Duration,
    /// Fallback notification target for tasks without their own. Blank
    /// means unconfigured: such tasks are skipped, not failed.
    pub webhook_url: String,
    /// Fallback shame text for tasks whose own message is blank.
    pub shame_message: String,
}

/// What one tick did, for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Tasks returned by the eligibility scan.
    pub examined: usize,
    /// Punished transitions committed.
    pub punished: usize,
    /// Delivery or storage failures; these tasks stay eligible.
    pub failed: usize,
    /// Tasks with no notification target configured anywhere.
    pub skipped: usize,
}

/// Background sweep over the task store.
pub struct PunishmentSweeper {
    db: Arc<Database>,
    sink: Arc<dyn NotificationSink>,
    config: SweepConfig,
}

impl PunishmentSweeper {
    pub fn new(db: Arc<Database>, sink: Arc<dyn NotificationSink>, config: SweepConfig) -> Self {
        Self { db, sink, config }
    }

    /// Start the sweep loop.
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.config.interval.as_secs(),
                "punishment sweep started"
            );
            let mut interval = tokio::time::interval(self.config.interval);

            loop {
                interval.tick().await;
                self.sweep().await;
            }
        })
    }

    /// Execute one tick: scan, deliver, commit. Per-task failures never
    /// abort the rest of the tick.
    pub async fn sweep(&self) -> SweepOutcome {
        let now = now_ms();
        let mut outcome = SweepOutcome::default();

        let overdue = match self.db.overdue_tasks(now) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("eligibility scan failed, retrying next tick: {e}");
                return outcome;
            }
        };

        outcome.examined = overdue.len();
        if !overdue.is_empty() {
            info!(count = overdue.len(), "overdue tasks found");
        }

        for task in &overdue {
            self.punish(task, &mut outcome).await;
        }

        if outcome.examined > 0 {
            info!(
                punished = outcome.punished,
                failed = outcome.failed,
                skipped = outcome.skipped,
                "sweep finished"
            );
        }
        outcome
    }

    async fn punish(&self, task: &Task, outcome: &mut SweepOutcome) {
        let Some(target) = resolve_target(task, &self.config.webhook_url) else {
            warn!(task_id = %task.id, "no webhook target configured, skipping punishment");
            outcome.skipped += 1;
            return;
        };

        let message = compose_message(task, &self.config.shame_message);

        if let Err(e) = self.sink.send(target, &message).await {
            warn!(task_id = %task.id, "delivery failed, will retry next tick: {e}");
            outcome.failed += 1;
            return;
        }

        // Delivery accepted; commit the transition. The guarded UPDATE
        // leaves the flag alone if the task was completed or deleted while
        // the webhook was in flight.
        match self.db.mark_punished(&task.id, now_ms()) {
            Ok(true) => {
                info!(task_id = %task.id, "punishment executed");
                outcome.punished += 1;
            }
            Ok(false) => {
                debug!(task_id = %task.id, "task no longer eligible at write time, flag not set");
            }
            Err(e) => {
                error!(task_id = %task.id, "could not record punishment, will retry next tick: {e}");
                outcome.failed += 1;
            }
        }
    }
}

/// Pick the notification target: the task's own URL, else the configured
/// default, else nothing.
fn resolve_target<'a>(task: &'a Task, default_url: &'a str) -> Option<&'a str> {
    let own = task.webhook_url.trim();
    if !own.is_empty() {
        return Some(own);
    }
    let default = default_url.trim();
    if !default.is_empty() {
        return Some(default);
    }
    None
}

/// Build the shame notification. Exact formatting is presentation, but the
/// message always carries the content, the deadline, and the shame text.
pub fn compose_message(task: &Task, default_shame: &str) -> String {
    let deadline = task
        .deadline
        .and_then(format_deadline)
        .unwrap_or_else(|| "unknown".to_string());
    let shame = if task.shame_message.trim().is_empty() {
        default_shame
    } else {
        task.shame_message.as_str()
    };

    format!(
        "🚨 **DEADLINE MISSED** 🚨\nTask: **{}**\nDue: {}\nPenalty: **{}**",
        task.content, deadline, shame
    )
}

fn format_deadline(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}
