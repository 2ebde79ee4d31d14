//! Job dispatcher.
//!
//! [`Dispatcher`] launches one worker process per submitted job and keeps a
//! registry of the jobs still running. Jobs are independent: any number may
//! run at once, each with its own message stream and outcome. Policies such
//! as "one benchmark at a time" belong to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use benchbridge_core::{JobId, JobKind, JobRequest, LineIndex, ResultMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::build_command;
use crate::config::WorkerConfig;
use crate::error::JobError;
use crate::handle::JobHandle;
use crate::outcome::ProcessOutcome;
use crate::supervisor::{supervise, Supervision};

/// How long [`Dispatcher::shutdown`] waits for each supervisor to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Snapshot of a running job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub kind: JobKind,
    pub line_index: Option<LineIndex>,
    pub started_at: DateTime<Utc>,
}

struct ActiveJob {
    summary: JobSummary,
    /// Per-job token (child of the dispatcher's master token).
    cancel: CancellationToken,
    task_handle: JoinHandle<()>,
}

/// Launches worker processes and tracks them until they finish.
///
/// Cheap to clone; clones share the registry and the master token.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<WorkerConfig>,
    jobs: Arc<RwLock<HashMap<JobId, ActiveJob>>>,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config: Arc::new(config),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start a job and return its handle immediately.
    ///
    /// Never fails: a worker that cannot be started is reported through the
    /// handle's outcome like any other failure.
    pub async fn submit(&self, request: JobRequest) -> JobHandle {
        let job_id = JobId::new();
        let kind = request.kind();
        let line_index = request.line_index();
        let cancel = self.cancel.child_token();

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let summary = JobSummary {
            job_id,
            kind,
            line_index,
            started_at: Utc::now(),
        };

        // Hold the write lock across the spawn so the task cannot try to
        // deregister before the entry exists.
        let mut jobs = self.jobs.write().await;

        let task_handle = {
            let config = Arc::clone(&self.config);
            let registry = Arc::clone(&self.jobs);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let outcome = run_job(&config, job_id, &request, cancel, msg_tx).await;
                registry.write().await.remove(&job_id);
                log_outcome(&outcome);
                if outcome_tx.send(outcome).is_err() {
                    tracing::debug!(%job_id, "Job handle dropped before outcome");
                }
            })
        };

        tracing::info!(%job_id, %kind, ?line_index, "Job submitted");

        jobs.insert(
            job_id,
            ActiveJob {
                summary,
                cancel: cancel.clone(),
                task_handle,
            },
        );

        JobHandle::new(job_id, kind, line_index, msg_rx, outcome_rx, cancel)
    }

    /// Cancel a running job. Returns `false` when the job is unknown or has
    /// already finished.
    pub async fn cancel(&self, job_id: JobId) -> bool {
        match self.jobs.read().await.get(&job_id) {
            Some(job) => {
                tracing::info!(%job_id, "Cancelling job");
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Jobs that have been submitted and have not yet reported an outcome,
    /// oldest first.
    pub async fn active_jobs(&self) -> Vec<JobSummary> {
        let mut jobs: Vec<_> = self
            .jobs
            .read()
            .await
            .values()
            .map(|job| job.summary.clone())
            .collect();
        jobs.sort_by_key(|job| job.started_at);
        jobs
    }

    /// Kill every running worker and wait for their supervisors to report.
    ///
    /// Jobs submitted afterwards fail immediately as cancelled.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job dispatcher");
        self.cancel.cancel();

        let drained: Vec<_> = self.jobs.write().await.drain().collect();
        for (job_id, job) in drained {
            tracing::debug!(%job_id, "Waiting for job supervisor");
            if tokio::time::timeout(SHUTDOWN_GRACE, job.task_handle)
                .await
                .is_err()
            {
                tracing::warn!(%job_id, "Job supervisor did not stop in time");
            }
        }

        tracing::info!("Job dispatcher shut down complete");
    }
}

async fn run_job(
    config: &WorkerConfig,
    job_id: JobId,
    request: &JobRequest,
    cancel: CancellationToken,
    messages: mpsc::UnboundedSender<ResultMessage>,
) -> ProcessOutcome {
    let kind = request.kind();

    if cancel.is_cancelled() {
        return ProcessOutcome::failed(job_id, kind, JobError::Cancelled);
    }

    let cmd = match build_command(config, job_id, request).await {
        Ok(cmd) => cmd,
        Err(e) => return ProcessOutcome::failed(job_id, kind, e),
    };

    supervise(
        cmd,
        Supervision {
            job_id,
            kind,
            timeout: config.timeout_for(kind),
            stderr_tail_lines: config.stderr_tail_lines,
            cancel,
            messages,
        },
    )
    .await
}

fn log_outcome(outcome: &ProcessOutcome) {
    let job_id = outcome.job_id;
    let kind = outcome.kind;
    match &outcome.error {
        None => tracing::info!(
            %job_id,
            %kind,
            duration_ms = outcome.duration_ms,
            messages = outcome.message_count,
            "Job completed",
        ),
        Some(JobError::Cancelled) => tracing::info!(%job_id, %kind, "Job cancelled"),
        Some(e) => tracing::warn!(
            %job_id,
            %kind,
            exit_code = outcome.exit_code,
            signal = ?outcome.signal,
            code = e.code(),
            error = %e,
            "Job failed",
        ),
    }
}
