//! Typed job requests submitted to the worker.
//!
//! A [`JobRequest`] can only be built through the validating constructors of
//! its variants, so anything handed to the dispatcher already satisfies the
//! request invariants. Each variant has a fixed JSON argument shape, produced
//! by [`JobRequest::worker_argument`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::LineIndex;

/// Worker script that runs a full model/strategy benchmark.
pub const SCRIPT_COMBINATION: &str = "Combination";

/// Worker script that generates a single query for one source file.
pub const SCRIPT_QUERY_GENERATION: &str = "QueryGeneration";

/// The kind of work a job performs. Selects the worker entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Benchmark,
    QueryGeneration,
}

impl JobKind {
    /// Name of the worker script (without extension) for this kind.
    pub fn script_name(&self) -> &'static str {
        match self {
            Self::Benchmark => SCRIPT_COMBINATION,
            Self::QueryGeneration => SCRIPT_QUERY_GENERATION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benchmark => "benchmark",
            Self::QueryGeneration => "query_generation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One query/source pair of a benchmark form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLine {
    pub query: String,
    pub source: String,
}

impl QueryLine {
    pub fn new(query: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source: source.into(),
        }
    }
}

/// A full benchmark run over every query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRequest {
    model: String,
    strategy: String,
    directory_path: String,
    lines: Vec<QueryLine>,
}

impl BenchmarkRequest {
    /// Build a benchmark request.
    ///
    /// Fails with [`CoreError::Validation`] when the model, strategy or
    /// directory is blank, when there are no lines, or when any line has a
    /// blank query or source.
    pub fn new(
        model: impl Into<String>,
        strategy: impl Into<String>,
        directory_path: impl Into<String>,
        lines: Vec<QueryLine>,
    ) -> Result<Self, CoreError> {
        let request = Self {
            model: model.into(),
            strategy: strategy.into(),
            directory_path: directory_path.into(),
            lines,
        };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), CoreError> {
        require_non_blank("model", &self.model)?;
        require_non_blank("strategy", &self.strategy)?;
        require_non_blank("directory path", &self.directory_path)?;

        if self.lines.is_empty() {
            return Err(CoreError::Validation(
                "a benchmark needs at least one query line".to_string(),
            ));
        }

        for (index, line) in self.lines.iter().enumerate() {
            if is_blank(&line.query) || is_blank(&line.source) {
                return Err(CoreError::Validation(format!(
                    "query line {index} must have both a query and a source"
                )));
            }
        }

        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn directory_path(&self) -> &str {
        &self.directory_path
    }

    pub fn lines(&self) -> &[QueryLine] {
        &self.lines
    }
}

/// Generation of a single query for the line at `line_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGenerationRequest {
    directory_path: String,
    source_file: String,
    line_index: LineIndex,
}

impl QueryGenerationRequest {
    pub fn new(
        directory_path: impl Into<String>,
        source_file: impl Into<String>,
        line_index: LineIndex,
    ) -> Result<Self, CoreError> {
        let directory_path = directory_path.into();
        let source_file = source_file.into();
        require_non_blank("directory path", &directory_path)?;
        require_non_blank("source file", &source_file)?;

        Ok(Self {
            directory_path,
            source_file,
            line_index,
        })
    }

    pub fn directory_path(&self) -> &str {
        &self.directory_path
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn line_index(&self) -> LineIndex {
        self.line_index
    }
}

/// A validated unit of work for the worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Benchmark(BenchmarkRequest),
    QueryGeneration(QueryGenerationRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Benchmark(_) => JobKind::Benchmark,
            Self::QueryGeneration(_) => JobKind::QueryGeneration,
        }
    }

    /// The originating line index, for query-generation jobs only.
    pub fn line_index(&self) -> Option<LineIndex> {
        match self {
            Self::Benchmark(_) => None,
            Self::QueryGeneration(req) => Some(req.line_index),
        }
    }

    /// Serialize the request into the single JSON argument the worker expects.
    ///
    /// - benchmark: `{"selectedModel","selectedStrategy","selectedPath","lines"}`
    /// - query generation: `{"path","source","index"}`
    pub fn worker_argument(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Benchmark(req) => serde_json::to_string(&BenchmarkArgument {
                selected_model: &req.model,
                selected_strategy: &req.strategy,
                selected_path: &req.directory_path,
                lines: &req.lines,
            }),
            Self::QueryGeneration(req) => serde_json::to_string(&QueryGenerationArgument {
                path: &req.directory_path,
                source: &req.source_file,
                index: req.line_index,
            }),
        }
    }
}

impl From<BenchmarkRequest> for JobRequest {
    fn from(req: BenchmarkRequest) -> Self {
        Self::Benchmark(req)
    }
}

impl From<QueryGenerationRequest> for JobRequest {
    fn from(req: QueryGenerationRequest) -> Self {
        Self::QueryGeneration(req)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BenchmarkArgument<'a> {
    selected_model: &'a str,
    selected_strategy: &'a str,
    selected_path: &'a str,
    lines: &'a [QueryLine],
}

#[derive(Serialize)]
struct QueryGenerationArgument<'a> {
    path: &'a str,
    source: &'a str,
    index: LineIndex,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if is_blank(value) {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
