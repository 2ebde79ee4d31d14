use benchbridge_core::{JobId, JobKind, LineIndex, ResultMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::outcome::ProcessOutcome;

/// Caller-side view of one submitted job.
///
/// Messages arrive through [`next_message`](Self::next_message) in the
/// order the worker wrote them; the terminal [`ProcessOutcome`] arrives
/// through [`outcome`](Self::outcome) after the last message. Alternatively
/// hand both callbacks to [`observe`](Self::observe).
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    kind: JobKind,
    line_index: Option<LineIndex>,
    messages: mpsc::UnboundedReceiver<ResultMessage>,
    outcome: oneshot::Receiver<ProcessOutcome>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(
        job_id: JobId,
        kind: JobKind,
        line_index: Option<LineIndex>,
        messages: mpsc::UnboundedReceiver<ResultMessage>,
        outcome: oneshot::Receiver<ProcessOutcome>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id,
            kind,
            line_index,
            messages,
            outcome,
            cancel,
        }
    }

    pub fn id(&self) -> JobId {
        self.job_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Form line this job writes back to; `None` for benchmarks.
    pub fn line_index(&self) -> Option<LineIndex> {
        self.line_index
    }

    /// Kill the worker. The outcome will report [`JobError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this job, for callers that hand the handle away.
    pub fn canceller(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next stdout line, or `None` once the stream ended or the job was
    /// cancelled. Nothing is yielded after cancellation.
    pub async fn next_message(&mut self) -> Option<ResultMessage> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            msg = self.messages.recv() => msg,
        }
    }

    /// Wait for the terminal outcome.
    ///
    /// Unread messages are discarded.
    pub async fn outcome(self) -> ProcessOutcome {
        let Self {
            job_id,
            kind,
            outcome,
            ..
        } = self;
        outcome
            .await
            .unwrap_or_else(|_| ProcessOutcome::failed(job_id, kind, JobError::SupervisorLost))
    }

    /// Drive the job in the background: `on_message` for each line in
    /// order, then `on_completion` exactly once.
    pub fn observe<M, C>(mut self, mut on_message: M, on_completion: C) -> JoinHandle<()>
    where
        M: FnMut(ResultMessage) + Send + 'static,
        C: FnOnce(ProcessOutcome) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(msg) = self.next_message().await {
                on_message(msg);
            }
            on_completion(self.outcome().await);
        })
    }
}
