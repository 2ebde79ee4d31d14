//! Per-job worker supervision.
//!
//! [`supervise`] spawns the prepared command, forwards every stdout line to
//! the job's message channel in write order, keeps a tail of stderr for
//! failure reports, and waits for exit, cancellation or timeout. It always
//! produces exactly one [`ProcessOutcome`].

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::{Duration, Instant};

use benchbridge_core::{JobId, JobKind, ResultMessage};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::outcome::{classify_exit, exit_signal, ProcessOutcome, NO_EXIT_CODE};

/// Everything the supervisor needs besides the command itself.
pub(crate) struct Supervision {
    pub job_id: JobId,
    pub kind: JobKind,
    pub timeout: Option<Duration>,
    pub stderr_tail_lines: usize,
    pub cancel: CancellationToken,
    pub messages: mpsc::UnboundedSender<ResultMessage>,
}

enum Termination {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

pub(crate) async fn supervise(mut cmd: Command, job: Supervision) -> ProcessOutcome {
    let Supervision {
        job_id,
        kind,
        timeout,
        stderr_tail_lines,
        cancel,
        messages,
    } = job;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return ProcessOutcome::failed(job_id, kind, JobError::Spawn { program, source });
        }
    };

    tracing::info!(%job_id, %kind, pid = child.id(), "Worker spawned");

    // Readers stop early on cancellation or timeout; on a normal exit they
    // drain the pipes to EOF so every line written before exit is delivered.
    let stop_readers = CancellationToken::new();
    let stdout_task = tokio::spawn(forward_stdout(
        child.stdout.take(),
        job_id,
        messages,
        stop_readers.clone(),
    ));
    let stderr_task = tokio::spawn(collect_stderr(
        child.stderr.take(),
        job_id,
        stderr_tail_lines,
        stop_readers.clone(),
    ));
    let readers = async move { tokio::join!(stdout_task, stderr_task) };
    tokio::pin!(readers);

    let deadline = timeout.map(|limit| tokio::time::Instant::now() + limit);

    let mut termination = tokio::select! {
        status = child.wait() => Termination::Exited(status),
        _ = cancel.cancelled() => Termination::Cancelled,
        _ = expire(deadline) => Termination::TimedOut,
    };

    let mut signal = None;
    let (stdout_result, stderr_result) = if matches!(termination, Termination::Exited(_)) {
        // A process left behind by the worker can hold the pipes open past
        // its exit. The deadline and cancellation still apply until EOF.
        tokio::select! {
            biased;
            joined = &mut readers => joined,
            _ = cancel.cancelled() => {
                tracing::warn!(%job_id, "Cancelled while worker output was still open");
                termination = Termination::Cancelled;
                stop_readers.cancel();
                (&mut readers).await
            }
            _ = expire(deadline) => {
                tracing::warn!(%job_id, "Worker output still open at deadline");
                termination = Termination::TimedOut;
                stop_readers.cancel();
                (&mut readers).await
            }
        }
    } else {
        stop_readers.cancel();
        if let Err(e) = child.kill().await {
            tracing::warn!(%job_id, error = %e, "Failed to kill worker");
        }
        signal = child.try_wait().ok().flatten().and_then(exit_signal);
        (&mut readers).await
    };

    let message_count = stdout_result.unwrap_or_else(|e| {
        tracing::error!(%job_id, error = %e, "stdout reader task failed");
        0
    });
    let stderr_tail = stderr_result.unwrap_or_default();
    let duration_ms = start.elapsed().as_millis() as u64;

    let (exit_code, signal, error) = match termination {
        Termination::Exited(Ok(status)) => classify_exit(status, stderr_tail),
        Termination::Exited(Err(e)) => (NO_EXIT_CODE, None, Some(JobError::Io(e))),
        Termination::Cancelled => (NO_EXIT_CODE, signal, Some(JobError::Cancelled)),
        Termination::TimedOut => (
            NO_EXIT_CODE,
            signal,
            Some(JobError::TimedOut {
                elapsed_ms: duration_ms,
            }),
        ),
    };

    ProcessOutcome {
        job_id,
        kind,
        exit_code,
        signal,
        error,
        duration_ms,
        message_count,
    }
}

/// Resolves at `deadline`, or never without one.
async fn expire(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Forward each stdout line to `messages`, returning the number forwarded.
///
/// Keeps reading after the receiver is gone so the worker never blocks on
/// a full pipe.
async fn forward_stdout<R: AsyncRead + Unpin>(
    stdout: Option<R>,
    job_id: JobId,
    messages: mpsc::UnboundedSender<ResultMessage>,
    stop: CancellationToken,
) -> u64 {
    let Some(stdout) = stdout else {
        return 0;
    };
    let mut reader = BufReader::new(stdout);
    let mut seq = 0u64;
    let mut receiver_open = true;

    while let Some(line) = next_line(&mut reader, &stop).await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Failed reading worker stdout");
                break;
            }
        };

        if receiver_open
            && messages
                .send(ResultMessage { job_id, seq, line })
                .is_err()
        {
            tracing::debug!(%job_id, "Message receiver dropped, discarding further output");
            receiver_open = false;
        }
        seq += 1;
    }

    seq
}

/// Log stderr lines and keep the last `tail_lines` of them.
async fn collect_stderr<R: AsyncRead + Unpin>(
    stderr: Option<R>,
    job_id: JobId,
    tail_lines: usize,
    stop: CancellationToken,
) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };
    let mut reader = BufReader::new(stderr);
    let mut tail = VecDeque::with_capacity(tail_lines);

    while let Some(Ok(line)) = next_line(&mut reader, &stop).await {
        tracing::debug!(%job_id, line = %line, "worker stderr");
        if tail_lines == 0 {
            continue;
        }
        if tail.len() == tail_lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    Vec::from(tail).join("\n")
}

/// Read one line, decoding invalid UTF-8 lossily and stripping the line
/// terminator. `None` at EOF or once `stop` fires.
async fn next_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    stop: &CancellationToken,
) -> Option<std::io::Result<String>> {
    let mut buf = Vec::new();
    let read = tokio::select! {
        biased;
        _ = stop.cancelled() => return None,
        read = reader.read_until(b'\n', &mut buf) => read,
    };

    match read {
        Ok(0) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            Some(Ok(String::from_utf8_lossy(&buf).into_owned()))
        }
        Err(e) => Some(Err(e)),
    }
}
