//! Pipeline statistics tracking.
//!
//! Thread-safe counters for drops, duplicate schedule attempts, and lookup
//! failures. Shared across tasks via `Arc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::StatKind;

/// Thread-safe pipeline statistics tracker.
///
/// All counters are initialized to zero on creation, so `increment` can never
/// observe a missing key for a valid [`StatKind`].
pub struct PipelineStats {
    counters: HashMap<StatKind, AtomicUsize>,
}

impl PipelineStats {
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for kind in StatKind::iter() {
            counters.insert(kind, AtomicUsize::new(0));
        }
        PipelineStats { counters }
    }

    /// Increment the counter for `kind`.
    pub fn increment(&self, kind: StatKind) {
        if let Some(counter) = self.counters.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in PipelineStats initialization.",
                kind
            );
        }
    }

    /// Current count for `kind`.
    pub fn get(&self, kind: StatKind) -> usize {
        self.counters
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Logs a summary of all non-zero counters at info level.
    pub fn log_summary(&self) {
        let mut any = false;
        for kind in StatKind::iter() {
            let count = self.get(kind);
            if count > 0 {
                log::info!("{}: {}", kind, count);
                any = true;
            }
        }
        if !any {
            log::info!("No drops or lookup failures recorded");
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}
