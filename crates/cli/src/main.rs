//! `benchbridge` -- headless driver for the benchmark and query-generation
//! workers.
//!
//! # Environment variables
//!
//! | Variable                       | Default     | Description                                  |
//! |--------------------------------|-------------|----------------------------------------------|
//! | `BENCH_WORKER_INTERPRETER`     | `python3`   | Program that runs the worker scripts         |
//! | `BENCH_WORKER_ARGS`            | `-u`        | Interpreter arguments before the script path |
//! | `BENCH_SCRIPTS_DIR`            | `scripts`   | Directory holding the worker scripts         |
//! | `BENCH_BENCHMARK_TIMEOUT_SECS` | unset       | Benchmark wall-clock limit (`0` = none)      |
//! | `BENCH_QUERY_TIMEOUT_SECS`     | `300`       | Query-generation wall-clock limit            |
//! | `BENCH_STDERR_TAIL_LINES`      | `20`        | stderr lines attached to failures            |
//! | `BENCH_EVENT_CAPACITY`         | `1024`      | Event bus buffer size                        |
//! | `LOG_FORMAT`                   | `text`      | `json` for structured logs on stderr         |
//! | `RUST_LOG`                     | `benchbridge=info` | Log filter                            |

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use benchbridge_cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "benchbridge=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let cli = Cli::parse();
    run(cli).await
}
