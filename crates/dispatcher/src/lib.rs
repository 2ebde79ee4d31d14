//! Worker process dispatch.
//!
//! Each submitted [`JobRequest`](benchbridge_core::JobRequest) runs as its
//! own interpreter process. Its stdout lines stream back through a
//! [`JobHandle`] and a single [`ProcessOutcome`] closes the job.

mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod outcome;
mod supervisor;

pub use config::WorkerConfig;
pub use dispatcher::{Dispatcher, JobSummary};
pub use error::JobError;
pub use handle::JobHandle;
pub use outcome::{ProcessOutcome, NO_EXIT_CODE};
