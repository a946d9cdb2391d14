//! Progress event types and broadcast channel for live scrape status.
//!
//! The orchestrator emits a `ProgressEvent` for every state transition and
//! every soft issue. Events flow through a `tokio::sync::broadcast` channel
//! to any subscriber (the CLI spinner, a log sink). When no subscriber
//! exists, events are silently dropped.

use serde::Serialize;

use crate::orchestrator::ScrapeState;

/// A progress event emitted while a scrape runs.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Monotonically increasing within one scrape.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// The pipeline entered a new state.
    StateChanged { state: ScrapeState, message: String },
    /// A non-fatal problem was worked around.
    Warning { message: String },
}

impl ProgressEventKind {
    pub fn message(&self) -> &str {
        match self {
            Self::StateChanged { message, .. } | Self::Warning { message } => message,
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel.
///
/// A scrape emits a dozen or so events; 64 leaves room for slow consumers.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Emit a progress event, ignoring send errors (no receivers listening).
pub fn emit(tx: &Option<ProgressSender>, seq: &mut u64, event: ProgressEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent { seq: *seq, event });
    }
}
