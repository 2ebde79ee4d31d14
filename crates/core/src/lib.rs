//! Domain types for the benchmark bridge.
//!
//! Pure data and parsing: job requests and their worker argument format,
//! worker message interpretation, directory browsing and the model/strategy
//! catalog. Process management lives in `benchbridge-dispatcher`.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod job;
pub mod messages;
pub mod types;

pub use error::CoreError;
pub use job::{BenchmarkRequest, JobKind, JobRequest, QueryGenerationRequest, QueryLine};
pub use messages::{BenchmarkRow, GeneratedQuery, MessageError, ResultMessage};
pub use types::{JobId, LineIndex};
