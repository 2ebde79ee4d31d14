use benchbridge_core::{CoreError, LineIndex};

/// Why the bridge refused an operation.
///
/// Failures of jobs that did start are not errors here; they arrive as
/// [`EventPayload::JobFailed`](crate::EventPayload::JobFailed) events.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A benchmark is already running.
    #[error("A benchmark is already running")]
    BenchmarkInProgress,

    /// A query-generation job for this line is already running.
    #[error("Query generation already running for line {0}")]
    LineBusy(LineIndex),
}
