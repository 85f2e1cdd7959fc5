//! Progress logging utilities.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;

use crate::error_handling::{PipelineStats, StatKind};
use crate::registry::DomainRegistry;

/// Logs one progress line for the monitor run.
pub fn log_progress(
    start_time: std::time::Instant,
    events_seen: &AtomicUsize,
    registry: &DomainRegistry,
    stats: &PipelineStats,
) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let events = events_seen.load(Ordering::SeqCst);
    let rate = if elapsed_secs > 0.0 {
        events as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Observed {} events across {} domains ({} dropped) in {:.1}s (~{:.1} events/sec)",
        events,
        registry.len(),
        stats.get(StatKind::InvalidDomainDropped),
        elapsed_secs,
        rate
    );
}
