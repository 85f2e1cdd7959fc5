//! Error types and pipeline statistics.
//!
//! This module defines all error types used throughout the pipeline and the
//! thread-safe counters used to track drops and lookup failures.

mod stats;
mod types;

pub use stats::PipelineStats;
pub use types::{InitializationError, InvalidDomain, LookupError, SinkError, StatKind};
