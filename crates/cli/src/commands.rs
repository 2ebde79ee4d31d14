//! Subcommand implementations.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use benchbridge_core::catalog::{self, KNOWN_MODELS, KNOWN_STRATEGIES, RESULT_COLUMNS};
use benchbridge_core::directory::PromptPicker;
use benchbridge_core::{JobId, LineIndex, QueryLine};
use benchbridge_events::{Bridge, BridgeConfig, BridgeEvent, EventPayload};
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::args::{Cli, Command};
use crate::output::print_json;

/// Run the parsed command line to completion.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = BridgeConfig::from_env();
    if let Some(dir) = cli.scripts_dir {
        config.worker.scripts_dir = dir;
    }
    if let Some(interpreter) = cli.interpreter {
        config.worker.interpreter = interpreter;
    }
    tracing::debug!(?config, "Loaded configuration");

    let bridge = Bridge::new(config);

    let status = match cli.command {
        Command::Ls { path } => list(&bridge, &path).await,
        Command::Pick => pick(&bridge).await,
        Command::Catalog => print_catalog(),
        Command::Benchmark {
            model,
            strategy,
            path,
            lines,
        } => benchmark(&bridge, model, strategy, path, lines).await,
        Command::Generate {
            path,
            source,
            index,
        } => generate(&bridge, path, source, index).await,
    };

    bridge.shutdown().await;
    status
}

async fn list(bridge: &Bridge, path: &Path) -> anyhow::Result<ExitCode> {
    let mut rx = bridge.subscribe();
    bridge
        .list_directory(path)
        .await
        .with_context(|| format!("Cannot list {}", path.display()))?;

    while let Ok(event) = rx.try_recv() {
        print_json(&event)?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn pick(bridge: &Bridge) -> anyhow::Result<ExitCode> {
    let base_dir = std::env::current_dir().context("Cannot determine current directory")?;
    let mut picker = PromptPicker::new(BufReader::new(tokio::io::stdin()), base_dir);

    let mut stderr = tokio::io::stderr();
    stderr.write_all(b"Directory (empty to cancel): ").await?;
    stderr.flush().await?;

    match bridge.open_directory(&mut picker).await? {
        Some(path) => list(bridge, &path).await,
        None => {
            tracing::info!("No directory selected");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Serialize)]
struct Catalog {
    models: &'static [&'static str],
    strategies: &'static [&'static str],
    columns: &'static [&'static str],
}

fn print_catalog() -> anyhow::Result<ExitCode> {
    print_json(&Catalog {
        models: KNOWN_MODELS,
        strategies: KNOWN_STRATEGIES,
        columns: &RESULT_COLUMNS,
    })?;
    Ok(ExitCode::SUCCESS)
}

async fn benchmark(
    bridge: &Bridge,
    model: String,
    strategy: String,
    path: String,
    lines: Vec<QueryLine>,
) -> anyhow::Result<ExitCode> {
    if !catalog::is_known_model(&model) {
        tracing::warn!(model = %model, "Model is not in the catalog; passing it to the worker anyway");
    }
    if !catalog::is_known_strategy(&strategy) {
        tracing::warn!(strategy = %strategy, "Strategy is not in the catalog; passing it to the worker anyway");
    }

    let rx = bridge.subscribe();
    let job_id = bridge
        .submit_benchmark(model, strategy, path, lines)
        .await
        .context("Benchmark was not started")?;
    follow_job(bridge, rx, job_id).await
}

async fn generate(
    bridge: &Bridge,
    path: String,
    source: String,
    index: LineIndex,
) -> anyhow::Result<ExitCode> {
    let rx = bridge.subscribe();
    let job_id = bridge
        .submit_query_generation(path, source, index)
        .await
        .context("Query generation was not started")?;
    follow_job(bridge, rx, job_id).await
}

/// Print the job's events until it ends. Ctrl-C cancels the job and keeps
/// waiting for its terminal event.
async fn follow_job(
    bridge: &Bridge,
    mut rx: broadcast::Receiver<BridgeEvent>,
    job_id: JobId,
) -> anyhow::Result<ExitCode> {
    let mut interrupted = false;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) if event.job_id() == Some(job_id) => {
                    print_json(&event)?;
                    if event.is_terminal() {
                        return Ok(if job_succeeded(&event.payload) {
                            ExitCode::SUCCESS
                        } else {
                            ExitCode::FAILURE
                        });
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind; events were dropped");
                }
                Err(RecvError::Closed) => anyhow::bail!("Event bus closed before job {job_id} finished"),
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal.context("Cannot listen for Ctrl-C")?;
                interrupted = true;
                tracing::info!(%job_id, "Interrupted, cancelling job");
                bridge.cancel(job_id).await;
            }
        }
    }
}

fn job_succeeded(terminal: &EventPayload) -> bool {
    !matches!(terminal, EventPayload::JobFailed { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_job_failed_counts_as_failure() {
        let failed = EventPayload::JobFailed {
            job_id: JobId::new(),
            kind: benchbridge_core::JobKind::Benchmark,
            line_index: None,
            code: "TIMED_OUT".to_string(),
            error: "Worker timed out after 10ms".to_string(),
            exit_code: -1,
            signal: Some("SIGKILL".to_string()),
        };
        assert!(!job_succeeded(&failed));

        let finished = EventPayload::BenchmarkFinished {
            job_id: JobId::new(),
            rows: 2,
        };
        assert!(job_succeeded(&finished));
    }
}
