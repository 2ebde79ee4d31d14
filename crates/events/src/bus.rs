//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans every [`BridgeEvent`] out to the presentation layer
//! (and anything else that subscribes). It is shared via `Arc<EventBus>`
//! between the [`Bridge`](crate::Bridge) and its routing tasks.

use benchbridge_core::{BenchmarkRow, JobId, JobKind, LineIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BridgeEvent
// ---------------------------------------------------------------------------

/// What happened.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"query_generated","job_id":"…","text":"…","line_index":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A benchmark worker was started.
    BenchmarkStarted {
        job_id: JobId,
        model: String,
        strategy: String,
        path: String,
    },

    /// A benchmark worker produced a result row.
    BenchmarkResult { job_id: JobId, row: BenchmarkRow },

    /// A benchmark worker exited successfully. `rows` counts the rows it
    /// produced.
    BenchmarkFinished { job_id: JobId, rows: usize },

    /// A query-generation worker was started for a form line.
    QueryGenerationStarted {
        job_id: JobId,
        line_index: LineIndex,
    },

    /// A generated query for one form line.
    QueryGenerated {
        job_id: JobId,
        text: String,
        line_index: LineIndex,
    },

    /// A query-generation worker exited successfully.
    QueryGenerationFinished {
        job_id: JobId,
        line_index: LineIndex,
    },

    /// A job ended in failure (including cancellation and timeout).
    JobFailed {
        job_id: JobId,
        kind: JobKind,
        line_index: Option<LineIndex>,
        /// Machine-readable failure category, e.g. `WORKER_EXIT_FAILURE`.
        code: String,
        error: String,
        exit_code: i32,
        signal: Option<String>,
    },

    /// A worker stdout line that could not be interpreted. Processing of
    /// later lines continues.
    MalformedMessage {
        job_id: JobId,
        kind: JobKind,
        raw: String,
        error: String,
    },

    /// Immediate children of a directory.
    DirectoryListed { path: String, entries: Vec<String> },
}

impl EventPayload {
    /// Job the event belongs to, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::BenchmarkStarted { job_id, .. }
            | Self::BenchmarkResult { job_id, .. }
            | Self::BenchmarkFinished { job_id, .. }
            | Self::QueryGenerationStarted { job_id, .. }
            | Self::QueryGenerated { job_id, .. }
            | Self::QueryGenerationFinished { job_id, .. }
            | Self::JobFailed { job_id, .. }
            | Self::MalformedMessage { job_id, .. } => Some(*job_id),
            Self::DirectoryListed { .. } => None,
        }
    }

    /// `true` for the last event a job publishes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BenchmarkFinished { .. }
                | Self::QueryGenerationFinished { .. }
                | Self::JobFailed { .. }
        )
    }
}

/// An event published by the bridge, stamped with its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEvent {
    #[serde(flatten)]
    pub payload: EventPayload,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl BridgeEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.payload.job_id()
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }
}

impl From<EventPayload> for BridgeEvent {
    fn from(payload: EventPayload) -> Self {
        Self::new(payload)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`BridgeEvent`].
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: impl Into<BridgeEvent>) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event.into());
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
