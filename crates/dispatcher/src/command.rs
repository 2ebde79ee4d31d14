//! Worker command construction.
//!
//! Every job runs as
//! `<interpreter> [interpreter args] <scripts_dir>/<Script>.<ext> <json>`
//! with the scripts directory as working directory.

use benchbridge_core::{JobId, JobRequest};
use tokio::process::Command;

use crate::config::WorkerConfig;
use crate::error::JobError;

/// Build the worker command for `request`.
///
/// Fails with [`JobError::ScriptNotFound`] when the script for the job kind
/// is missing, so the failure names the script rather than surfacing as a
/// generic interpreter error.
pub(crate) async fn build_command(
    config: &WorkerConfig,
    job_id: JobId,
    request: &JobRequest,
) -> Result<Command, JobError> {
    let kind = request.kind();
    let script = config.script_path(kind);

    match tokio::fs::metadata(&script).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(JobError::ScriptNotFound(script)),
    }
    // Absolute, since the worker's working directory changes below.
    let script = tokio::fs::canonicalize(&script)
        .await
        .map_err(|_| JobError::ScriptNotFound(script))?;

    let argument = request.worker_argument()?;

    let mut cmd = Command::new(&config.interpreter);
    cmd.args(&config.interpreter_args)
        .arg(&script)
        .arg(argument)
        .env("BENCH_JOB_ID", job_id.to_string())
        .env("BENCH_JOB_KIND", kind.as_str());

    if let Some(dir) = script.parent() {
        cmd.current_dir(dir);
    }

    Ok(cmd)
}
