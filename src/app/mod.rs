//! Application-level utilities: progress logging and shutdown handling.

pub mod logging;
pub mod shutdown;

// Re-export public API
pub use logging::log_progress;
pub use shutdown::shutdown_gracefully;
