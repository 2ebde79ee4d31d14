use benchbridge_dispatcher::WorkerConfig;

use crate::bus::DEFAULT_CAPACITY;

/// Settings for a [`Bridge`](crate::Bridge) session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub worker: WorkerConfig,
    /// Broadcast buffer size of the event bus.
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            event_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Worker settings come from [`WorkerConfig::from_env`]; in addition:
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `BENCH_EVENT_CAPACITY` | `1024`  |
    pub fn from_env() -> Self {
        let event_capacity = match std::env::var("BENCH_EVENT_CAPACITY") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid BENCH_EVENT_CAPACITY");
                DEFAULT_CAPACITY
            }),
            Err(_) => DEFAULT_CAPACITY,
        };

        Self {
            worker: WorkerConfig::from_env(),
            event_capacity,
        }
    }
}
