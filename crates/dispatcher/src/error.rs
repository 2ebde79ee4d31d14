//! Terminal failure causes of a job.

use std::path::PathBuf;

/// Why a job ended in failure.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The worker script does not exist.
    #[error("Worker script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// The interpreter could not be started.
    #[error("Failed to spawn worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The job request could not be turned into a worker argument.
    #[error("Failed to serialize job argument: {0}")]
    Argument(#[from] serde_json::Error),

    /// The worker ran and exited with a non-zero code.
    #[error("Worker exited with code {exit_code}: {stderr}")]
    WorkerExit { exit_code: i32, stderr: String },

    /// The worker was terminated by a signal it did not receive from us.
    #[error("Worker terminated by signal {signal}")]
    Signalled { signal: String },

    /// The worker exceeded its configured wall-clock limit and was killed.
    #[error("Worker timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    /// The job was cancelled and its worker killed.
    #[error("Job cancelled")]
    Cancelled,

    /// Waiting on the worker failed.
    #[error("I/O error while supervising worker: {0}")]
    Io(#[source] std::io::Error),

    /// The supervising task went away without reporting an outcome.
    #[error("Supervisor ended without reporting an outcome")]
    SupervisorLost,
}

impl JobError {
    /// Stable machine-readable code for the failure category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ScriptNotFound(_) | Self::Spawn { .. } | Self::Argument(_) => "SPAWN_FAILURE",
            Self::WorkerExit { .. } | Self::Signalled { .. } => "WORKER_EXIT_FAILURE",
            Self::TimedOut { .. } => "TIMED_OUT",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) | Self::SupervisorLost => "SUPERVISOR_FAILURE",
        }
    }

    /// `true` when no worker process ever ran for the job.
    pub fn is_spawn_failure(&self) -> bool {
        self.code() == "SPAWN_FAILURE"
    }
}
