//! Per-thread release accounting
//!
//! Calls are synchronous, so every buffer a call hands out is normally
//! released on the calling thread. Counting per thread keeps concurrently
//! running tests from seeing each other's traffic.

use std::cell::Cell;

/// Counters for buffers and handles crossing the boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Strings handed out (results and exception messages)
    pub strings_allocated: usize,
    /// Strings given back through `release_string`
    pub strings_released: usize,
    /// Int arrays handed out
    pub int_arrays_allocated: usize,
    /// Int arrays given back
    pub int_arrays_released: usize,
    /// String-array pointer tables handed out
    pub string_tables_allocated: usize,
    /// String-array pointer tables given back
    pub string_tables_released: usize,
    /// Object references issued
    pub handles_issued: usize,
    /// Object references released
    pub handles_released: usize,
    /// Releases of pointers that were never issued or were already released
    pub bogus_releases: usize,
}

impl Stats {
    /// Buffers handed out and not yet released
    pub fn outstanding_buffers(&self) -> usize {
        (self.strings_allocated + self.int_arrays_allocated + self.string_tables_allocated)
            .saturating_sub(
                self.strings_released + self.int_arrays_released + self.string_tables_released,
            )
    }

    /// Object references issued and not yet released
    pub fn outstanding_handles(&self) -> usize {
        self.handles_issued.saturating_sub(self.handles_released)
    }
}

thread_local! {
    static STATS: Cell<Stats> = Cell::new(Stats::default());
}

pub(crate) fn record(update: impl FnOnce(&mut Stats)) {
    STATS.with(|cell| {
        let mut stats = cell.get();
        update(&mut stats);
        cell.set(stats);
    });
}

/// Counters for the current thread
pub fn stats() -> Stats {
    STATS.with(Cell::get)
}

/// Zero the current thread's counters
pub fn reset_stats() {
    STATS.with(|cell| cell.set(Stats::default()));
}
