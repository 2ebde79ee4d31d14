use std::path::PathBuf;

use benchbridge_core::{LineIndex, QueryLine};
use clap::{Parser, Subcommand};

/// benchbridge - run embedding benchmarks and query generation workers
#[derive(Parser, Debug)]
#[command(name = "benchbridge")]
#[command(version)]
#[command(about = "Headless driver for the benchmark and query-generation workers", long_about = None)]
pub struct Cli {
    /// Directory holding Combination.py and QueryGeneration.py
    /// (overrides BENCH_SCRIPTS_DIR)
    #[arg(long = "scripts-dir", global = true)]
    pub scripts_dir: Option<PathBuf>,

    /// Interpreter used to run worker scripts (overrides BENCH_WORKER_INTERPRETER)
    #[arg(long = "interpreter", global = true)]
    pub interpreter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the immediate children of a directory
    Ls {
        path: PathBuf,
    },

    /// Read a directory path from stdin, then list it
    Pick,

    /// Print the known models, strategies and result columns
    Catalog,

    /// Run a benchmark and stream its result rows
    Benchmark {
        /// Embedding model, e.g. all-MiniLM-L6-v2
        #[arg(short = 'm', long = "model")]
        model: String,

        /// Vector search strategy (l2, cosine, ip)
        #[arg(short = 's', long = "strategy")]
        strategy: String,

        /// Directory with the source documents
        #[arg(short = 'p', long = "path")]
        path: String,

        /// Query line as `query=>source`; repeat for several lines
        #[arg(short = 'l', long = "line", required = true, value_parser = parse_query_line)]
        lines: Vec<QueryLine>,
    },

    /// Generate a query for one form line from a source document
    Generate {
        /// Directory with the source documents
        #[arg(short = 'p', long = "path")]
        path: String,

        /// Source document name inside the directory
        #[arg(short = 's', long = "source")]
        source: String,

        /// Form line the generated query belongs to
        #[arg(short = 'i', long = "index", default_value = "0")]
        index: LineIndex,
    },
}

/// Parse `query=>source`.
pub fn parse_query_line(raw: &str) -> Result<QueryLine, String> {
    let (query, source) = raw
        .split_once("=>")
        .ok_or_else(|| format!("expected `query=>source`, got `{raw}`"))?;
    Ok(QueryLine::new(query.trim(), source.trim()))
}
