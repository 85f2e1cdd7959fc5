//! Application initialization and resource setup.
//!
//! Provides functions to initialize shared resources: the logger, the DNS
//! resolver, and the semaphore bounding the enrichment worker pool.

mod logger;
mod resolver;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes a semaphore for bounding enrichment concurrency.
///
/// # Arguments
///
/// * `count` - Maximum number of concurrent enrichment tasks allowed
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
