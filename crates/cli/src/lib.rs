//! Command-line driver for the bridge.
//!
//! Stands in for the desktop UI: every bridge event is printed to stdout
//! as one JSON line, logs go to stderr.

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Command};
pub use commands::run;
