//! Atomic counter behind the generated output names.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Strictly increasing sequence shared by every image of a run.
///
/// Each call to [`NameSequencer::next`] returns a value never returned before,
/// also when called from several threads at once.
#[derive(Debug, Default)]
pub struct NameSequencer {
    next: AtomicUsize,
}

impl NameSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next value
    pub fn next(&self) -> usize {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
