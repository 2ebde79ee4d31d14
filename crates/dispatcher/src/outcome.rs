//! Terminal record of a job.

use std::process::ExitStatus;

use benchbridge_core::{JobId, JobKind};

use crate::error::JobError;

/// Exit code reported when the process never produced one (spawn failure,
/// killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// How a job ended. Delivered exactly once per job.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub job_id: JobId,
    pub kind: JobKind,
    /// Process exit code, or [`NO_EXIT_CODE`].
    pub exit_code: i32,
    /// Name of the terminating signal, if any (e.g. `SIGKILL`).
    pub signal: Option<String>,
    /// Set for every failed job; `None` means the worker exited with code 0.
    pub error: Option<JobError>,
    /// Wall-clock time from spawn to exit in milliseconds.
    pub duration_ms: u64,
    /// Number of stdout lines forwarded to the handle.
    pub message_count: u64,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Outcome for a job whose worker never started or whose supervisor
    /// was lost.
    pub(crate) fn failed(job_id: JobId, kind: JobKind, error: JobError) -> Self {
        Self {
            job_id,
            kind,
            exit_code: NO_EXIT_CODE,
            signal: None,
            error: Some(error),
            duration_ms: 0,
            message_count: 0,
        }
    }
}

/// Split an exit status into exit code, signal name and failure.
///
/// `stderr_tail` is attached to non-zero exits.
pub(crate) fn classify_exit(
    status: ExitStatus,
    stderr_tail: String,
) -> (i32, Option<String>, Option<JobError>) {
    if status.success() {
        return (0, None, None);
    }

    if let Some(exit_code) = status.code() {
        return (
            exit_code,
            None,
            Some(JobError::WorkerExit {
                exit_code,
                stderr: stderr_tail,
            }),
        );
    }

    match exit_signal(status) {
        Some(signal) => (
            NO_EXIT_CODE,
            Some(signal.clone()),
            Some(JobError::Signalled { signal }),
        ),
        None => (
            NO_EXIT_CODE,
            None,
            Some(JobError::WorkerExit {
                exit_code: NO_EXIT_CODE,
                stderr: stderr_tail,
            }),
        ),
    }
}

/// Name of the signal that terminated the process, if any.
#[cfg(unix)]
pub(crate) fn exit_signal(status: ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(signal_name)
}

#[cfg(not(unix))]
pub(crate) fn exit_signal(_status: ExitStatus) -> Option<String> {
    None
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        6 => "SIGABRT",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        15 => "SIGTERM",
        other => return format!("SIG{other}"),
    };
    name.to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn success_has_no_error() {
        let (code, signal, error) = classify_exit(ExitStatus::from_raw(0), String::new());
        assert_eq!(code, 0);
        assert!(signal.is_none());
        assert!(error.is_none());
    }

    #[test]
    fn non_zero_exit_is_worker_failure() {
        // Raw wait status: exit code lives in the high byte.
        let (code, signal, error) =
            classify_exit(ExitStatus::from_raw(1 << 8), "boom".to_string());
        assert_eq!(code, 1);
        assert!(signal.is_none());
        assert_matches!(
            error,
            Some(JobError::WorkerExit { exit_code: 1, stderr }) if stderr == "boom"
        );
    }

    #[test]
    fn signal_exit_is_named() {
        let (code, signal, error) = classify_exit(ExitStatus::from_raw(9), String::new());
        assert_eq!(code, NO_EXIT_CODE);
        assert_eq!(signal.as_deref(), Some("SIGKILL"));
        assert_matches!(error, Some(JobError::Signalled { .. }));
    }

    #[test]
    fn unknown_signal_uses_number() {
        assert_eq!(signal_name(42), "SIG42");
    }

    #[test]
    fn failed_outcome_is_not_success() {
        let outcome = ProcessOutcome::failed(JobId::new(), JobKind::Benchmark, JobError::Cancelled);
        assert!(!outcome.is_success());
        assert_eq!(outcome.exit_code, NO_EXIT_CODE);
    }
}
