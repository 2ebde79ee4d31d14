//! Caller boundary of the bridge.
//!
//! - [`Bridge`] -- session facade: directory browsing, job submission,
//!   result table and gate state.
//! - [`EventBus`] / [`BridgeEvent`] -- in-process publish/subscribe hub for
//!   everything the presentation layer reacts to.
//! - [`BenchmarkGate`] and [`PendingLines`] -- single-flight rules for
//!   benchmarks and per-line query generation.

pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod gate;
pub mod pending;
mod routing;
pub mod table;

pub use bridge::Bridge;
pub use bus::{BridgeEvent, EventBus, EventPayload};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use gate::{BenchmarkGate, BenchmarkPermit};
pub use pending::{LineClaim, PendingLines};
pub use table::ResultTable;
