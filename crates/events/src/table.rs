//! Accumulated benchmark results.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use benchbridge_core::BenchmarkRow;

/// Rows received from benchmark workers, in arrival order.
///
/// Rows accumulate across benchmark runs until [`clear`](Self::clear).
#[derive(Clone, Default)]
pub struct ResultTable {
    rows: Arc<Mutex<Vec<BenchmarkRow>>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: BenchmarkRow) {
        self.lock().push(row);
    }

    pub fn snapshot(&self) -> Vec<BenchmarkRow> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BenchmarkRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
