//! Worker stdout message types and parsers.
//!
//! The dispatcher treats every stdout line as an opaque [`ResultMessage`].
//! Interpretation depends on the job kind:
//!
//! - benchmark workers print a JSON array whose first element is a
//!   [`BenchmarkRow`];
//! - query-generation workers print a `[generatedQuery, lineIndex]` tuple,
//!   parsed into a [`GeneratedQuery`].

use serde::{Deserialize, Serialize};

use crate::types::{JobId, LineIndex};

/// One stdout line of a worker, in write order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultMessage {
    pub job_id: JobId,
    /// 0-based position of this line in the job's output.
    pub seq: u64,
    pub line: String,
}

impl ResultMessage {
    /// `true` for lines that carry no content (blank or whitespace only).
    pub fn is_blank(&self) -> bool {
        self.line.trim().is_empty()
    }
}

/// A row of the benchmark result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    #[serde(rename = "Embedding Model")]
    pub embedding_model: String,
    #[serde(rename = "DB Type")]
    pub db_type: String,
    #[serde(rename = "Strategy")]
    pub strategy: String,
    #[serde(rename = "Average k")]
    pub average_k: f64,
    #[serde(rename = "Sigma")]
    pub sigma: f64,
    #[serde(rename = "Frequency")]
    pub frequency: f64,
    #[serde(rename = "Queries")]
    pub queries: u64,
}

/// A query produced by a query-generation worker for one form line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuery {
    pub text: String,
    pub line_index: LineIndex,
}

/// Why a stdout line could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected message shape: {0}")]
    UnexpectedShape(String),
}

/// Parse a benchmark worker line: a JSON array whose element 0 is a row.
///
/// Elements after the first are ignored.
pub fn parse_benchmark_message(line: &str) -> Result<BenchmarkRow, MessageError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let first = value
        .as_array()
        .ok_or_else(|| MessageError::UnexpectedShape("expected a JSON array".to_string()))?
        .first()
        .cloned()
        .ok_or_else(|| MessageError::UnexpectedShape("empty result array".to_string()))?;

    Ok(serde_json::from_value(first)?)
}

/// Parse a query-generation worker line: `[generatedQuery, lineIndex]`.
pub fn parse_generated_query(line: &str) -> Result<GeneratedQuery, MessageError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if !value.is_array() {
        return Err(MessageError::UnexpectedShape(
            "expected a [query, index] array".to_string(),
        ));
    }

    let (text, line_index): (String, LineIndex) = serde_json::from_value(value)?;
    Ok(GeneratedQuery { text, line_index })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
