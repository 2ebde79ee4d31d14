use std::path::PathBuf;
use std::time::Duration;

use benchbridge_core::JobKind;

/// Default interpreter used to run worker scripts.
const DEFAULT_INTERPRETER: &str = "python3";

/// Default interpreter arguments. `-u` keeps Python stdout unbuffered so
/// each result line reaches the dispatcher as soon as it is printed.
const DEFAULT_INTERPRETER_ARGS: &str = "-u";

const DEFAULT_SCRIPTS_DIR: &str = "scripts";

const DEFAULT_SCRIPT_EXTENSION: &str = "py";

/// Query generation is a single model call; cap it so a hung worker does
/// not keep a form line locked forever.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 300;

const DEFAULT_STDERR_TAIL_LINES: usize = 20;

/// How worker processes are launched.
///
/// All fields have defaults suitable for running the Python workers from a
/// `scripts/` directory next to the binary. Override via environment
/// variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Program that runs a worker script (default: `python3`).
    pub interpreter: String,
    /// Arguments placed before the script path (default: `-u`).
    pub interpreter_args: Vec<String>,
    /// Directory holding `Combination.py` and `QueryGeneration.py`.
    /// Workers run with this directory as their working directory.
    pub scripts_dir: PathBuf,
    /// File extension of worker scripts, without the dot.
    pub script_extension: String,
    /// Wall-clock limit for benchmark jobs (`None` = unlimited).
    pub benchmark_timeout: Option<Duration>,
    /// Wall-clock limit for query-generation jobs (`None` = unlimited).
    pub query_timeout: Option<Duration>,
    /// Number of trailing stderr lines attached to failure reports.
    pub stderr_tail_lines: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            interpreter_args: split_args(DEFAULT_INTERPRETER_ARGS),
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            benchmark_timeout: None,
            query_timeout: Some(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)),
            stderr_tail_lines: DEFAULT_STDERR_TAIL_LINES,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default     |
    /// |--------------------------------|-------------|
    /// | `BENCH_WORKER_INTERPRETER`     | `python3`   |
    /// | `BENCH_WORKER_ARGS`            | `-u`        |
    /// | `BENCH_SCRIPTS_DIR`            | `scripts`   |
    /// | `BENCH_SCRIPT_EXTENSION`       | `py`        |
    /// | `BENCH_BENCHMARK_TIMEOUT_SECS` | unset       |
    /// | `BENCH_QUERY_TIMEOUT_SECS`     | `300`       |
    /// | `BENCH_STDERR_TAIL_LINES`      | `20`        |
    ///
    /// A timeout of `0` disables the limit.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            interpreter: std::env::var("BENCH_WORKER_INTERPRETER")
                .unwrap_or(default.interpreter),
            interpreter_args: std::env::var("BENCH_WORKER_ARGS")
                .map(|v| split_args(&v))
                .unwrap_or(default.interpreter_args),
            scripts_dir: std::env::var("BENCH_SCRIPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.scripts_dir),
            script_extension: std::env::var("BENCH_SCRIPT_EXTENSION")
                .unwrap_or(default.script_extension),
            benchmark_timeout: timeout_from_env("BENCH_BENCHMARK_TIMEOUT_SECS")
                .unwrap_or(default.benchmark_timeout),
            query_timeout: timeout_from_env("BENCH_QUERY_TIMEOUT_SECS")
                .unwrap_or(default.query_timeout),
            stderr_tail_lines: parse_env("BENCH_STDERR_TAIL_LINES")
                .unwrap_or(default.stderr_tail_lines),
        }
    }

    /// Path of the worker script that handles `kind`.
    pub fn script_path(&self, kind: JobKind) -> PathBuf {
        let mut file = kind.script_name().to_string();
        if !self.script_extension.is_empty() {
            file.push('.');
            file.push_str(&self.script_extension);
        }
        self.scripts_dir.join(file)
    }

    pub fn timeout_for(&self, kind: JobKind) -> Option<Duration> {
        match kind {
            JobKind::Benchmark => self.benchmark_timeout,
            JobKind::QueryGeneration => self.query_timeout,
        }
    }
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

/// `Some(None)` when the variable is `0`, `Some(Some(d))` for a positive
/// number of seconds, `None` when unset or invalid.
fn timeout_from_env(name: &str) -> Option<Option<Duration>> {
    parse_env::<u64>(name).map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
}
