//! Form lines with an outstanding query-generation job.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use benchbridge_core::LineIndex;

/// Set of line indices that currently have a generation job running.
#[derive(Clone, Default)]
pub struct PendingLines {
    lines: Arc<Mutex<BTreeSet<LineIndex>>>,
}

impl PendingLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `line_index` as pending, or `None` if it already is.
    pub fn try_claim(&self, line_index: LineIndex) -> Option<LineClaim> {
        self.lock().insert(line_index).then(|| LineClaim {
            lines: Arc::clone(&self.lines),
            line_index,
        })
    }

    pub fn is_pending(&self, line_index: LineIndex) -> bool {
        self.lock().contains(&line_index)
    }

    /// Pending indices in ascending order.
    pub fn snapshot(&self) -> Vec<LineIndex> {
        self.lock().iter().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<LineIndex>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its line index when dropped.
#[must_use = "the line is released as soon as the claim is dropped"]
pub struct LineClaim {
    lines: Arc<Mutex<BTreeSet<LineIndex>>>,
    line_index: LineIndex,
}

impl LineClaim {
    pub fn line_index(&self) -> LineIndex {
        self.line_index
    }
}

impl Drop for LineClaim {
    fn drop(&mut self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.line_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_line_cannot_be_claimed_twice() {
        let pending = PendingLines::new();
        let claim = pending.try_claim(2).expect("claim line 2");
        assert_eq!(claim.line_index(), 2);
        assert!(pending.try_claim(2).is_none());

        let other = pending.try_claim(0).expect("claim line 0");
        assert_eq!(pending.snapshot(), vec![0, 2]);

        drop(claim);
        assert!(!pending.is_pending(2));
        assert!(pending.is_pending(0));
        drop(other);
        assert!(pending.snapshot().is_empty());
    }
}
