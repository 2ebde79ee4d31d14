//! Single-flight gate for benchmark jobs.
//!
//! [`BenchmarkGate::try_acquire`] hands out at most one [`BenchmarkPermit`]
//! at a time. Dropping the permit reopens the gate, so whichever way the
//! routing task ends (finish, failure, cancellation or panic) the next
//! benchmark can be submitted.

use std::sync::Arc;

use tokio::sync::watch;

/// Whether a benchmark is running. Observable through a `watch` channel.
#[derive(Clone)]
pub struct BenchmarkGate {
    running: Arc<watch::Sender<bool>>,
}

impl BenchmarkGate {
    pub fn new() -> Self {
        let (running, _) = watch::channel(false);
        Self {
            running: Arc::new(running),
        }
    }

    /// Close the gate, or `None` if a benchmark already holds it.
    pub fn try_acquire(&self) -> Option<BenchmarkPermit> {
        let acquired = self.running.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });

        acquired.then(|| BenchmarkPermit {
            running: Arc::clone(&self.running),
        })
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Receiver that observes every open/close transition.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }
}

impl Default for BenchmarkGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the holder owns the benchmark slot.
#[must_use = "the gate reopens as soon as the permit is dropped"]
pub struct BenchmarkPermit {
    running: Arc<watch::Sender<bool>>,
}

impl Drop for BenchmarkPermit {
    fn drop(&mut self) {
        self.running.send_replace(false);
    }
}
