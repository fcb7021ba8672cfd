//! Session tracking for background comparisons.
//!
//! This module provides a simple in-memory tracker that holds, per comparison,
//! the validated request, progress, log entries and, once finished, the
//! result. The session is the server-side stand-in for the chart modal: it is
//! created when a comparison starts and discarded when the modal closes.
//! Finished sessions nobody discards expire after the retention period.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::services::comparison::{ComparisonOutcome, ComparisonPlan, ComparisonResult};
use crate::services::fetcher::BatchProgress;

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Running,
    Completed,
    Empty,
    Failed,
}

impl ComparisonStatus {
    pub fn is_finished(self) -> bool {
        self != ComparisonStatus::Running
    }
}

impl From<ComparisonOutcome> for ComparisonStatus {
    fn from(outcome: ComparisonOutcome) -> Self {
        match outcome {
            ComparisonOutcome::Completed => ComparisonStatus::Completed,
            ComparisonOutcome::Empty => ComparisonStatus::Empty,
            ComparisonOutcome::Failed => ComparisonStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// One comparison and everything known about it so far.
#[derive(Debug, Clone)]
pub struct ComparisonSession {
    pub comparison_id: String,
    pub status: ComparisonStatus,
    pub plan: ComparisonPlan,
    pub progress: Progress,
    pub logs: Vec<LogEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub result: Option<ComparisonResult>,
}

impl ComparisonSession {
    /// Whether the session finished at least `retention` before `now`.
    /// Running sessions never expire.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>, retention: Duration) -> bool {
        self.completed_at
            .and_then(|completed| (now - completed).to_std().ok())
            .is_some_and(|age| age >= retention)
    }
}

/// Retention used by [`ComparisonTracker::new`].
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// In-memory comparison tracker.
#[derive(Clone)]
pub struct ComparisonTracker {
    sessions: Arc<RwLock<HashMap<String, ComparisonSession>>>,
    retention: Duration,
}

impl Default for ComparisonTracker {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl ComparisonTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Drop every expired session; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, self.retention));
        before - sessions.len()
    }

    /// Number of live (unexpired) sessions.
    pub fn len(&self) -> usize {
        let now = chrono::Utc::now();
        self.sessions
            .read()
            .values()
            .filter(|session| !session.is_expired(now, self.retention))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a running comparison and return its id.
    ///
    /// Expired sessions are swept first.
    pub fn create(&self, plan: ComparisonPlan) -> String {
        let purged = self.purge_expired();
        if purged > 0 {
            log::debug!("Discarded {} expired comparison sessions", purged);
        }
        let comparison_id = Uuid::new_v4().to_string();
        let session = ComparisonSession {
            comparison_id: comparison_id.clone(),
            status: ComparisonStatus::Running,
            progress: Progress {
                completed: 0,
                total: plan.tasks.len(),
            },
            plan,
            logs: vec![],
            created_at: chrono::Utc::now(),
            completed_at: None,
            result: None,
        };
        self.sessions.write().insert(comparison_id.clone(), session);
        comparison_id
    }

    /// Add a log entry. Unknown ids are ignored.
    pub fn log(&self, comparison_id: &str, level: LogLevel, message: impl Into<String>) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(comparison_id) {
            session.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// Advance progress after one task and log "k of n complete".
    pub fn record_progress(&self, comparison_id: &str, progress: &BatchProgress) {
        {
            let mut sessions = self.sessions.write();
            match sessions.get_mut(comparison_id) {
                Some(session) => {
                    session.progress = Progress {
                        completed: progress.completed,
                        total: progress.total,
                    }
                }
                None => return,
            }
        }

        match &progress.error {
            None => self.log(
                comparison_id,
                LogLevel::Success,
                format!(
                    "{} of {} complete: {}",
                    progress.completed, progress.total, progress.task
                ),
            ),
            Some(error) => self.log(
                comparison_id,
                LogLevel::Warning,
                format!(
                    "{} of {} complete: {} failed ({})",
                    progress.completed, progress.total, progress.task, error
                ),
            ),
        }
    }

    /// Store the result; the status follows from its outcome.
    pub fn finish(&self, comparison_id: &str, result: ComparisonResult) {
        let level = match result.outcome() {
            ComparisonOutcome::Completed => LogLevel::Success,
            ComparisonOutcome::Empty => LogLevel::Warning,
            ComparisonOutcome::Failed => LogLevel::Error,
        };
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(comparison_id) {
            let now = chrono::Utc::now();
            session.status = result.outcome().into();
            session.completed_at = Some(now);
            session.logs.push(LogEntry {
                timestamp: now,
                level,
                message: result.summary(),
            });
            session.result = Some(result);
        }
    }

    /// Mark a running comparison as failed without a result.
    pub fn fail(&self, comparison_id: &str, error_message: impl Into<String>) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(comparison_id) {
            if session.status.is_finished() {
                return;
            }
            session.status = ComparisonStatus::Failed;
            session.completed_at = Some(chrono::Utc::now());
            session.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level: LogLevel::Error,
                message: error_message.into(),
            });
        }
    }

    /// Look up a session; expired sessions read as missing.
    pub fn get(&self, comparison_id: &str) -> Option<ComparisonSession> {
        self.live(comparison_id, |session| session.clone())
    }

    pub fn status(&self, comparison_id: &str) -> Option<ComparisonStatus> {
        self.live(comparison_id, |session| session.status)
    }

    pub fn get_logs(&self, comparison_id: &str) -> Vec<LogEntry> {
        self.live(comparison_id, |session| session.logs.clone()).unwrap_or_default()
    }

    /// Discard a session; returns whether a live one existed.
    pub fn remove(&self, comparison_id: &str) -> bool {
        let now = chrono::Utc::now();
        self.sessions
            .write()
            .remove(comparison_id)
            .is_some_and(|session| !session.is_expired(now, self.retention))
    }

    fn live<T>(&self, comparison_id: &str, f: impl FnOnce(&ComparisonSession) -> T) -> Option<T> {
        let now = chrono::Utc::now();
        self.sessions
            .read()
            .get(comparison_id)
            .filter(|session| !session.is_expired(now, self.retention))
            .map(f)
    }
}
