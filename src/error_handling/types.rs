//! Error type definitions.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Reasons a raw query name is rejected by the normalizer.
///
/// A rejected event is dropped: no registry mutation, no log entry. Drops are
/// counted via [`super::PipelineStats`] for observability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidDomain {
    /// The raw query name was empty after trimming.
    #[error("empty query name")]
    Empty,

    /// IP literals are not tracked as domains (policy choice).
    #[error("IP literal used as query target: {0}")]
    IpLiteral(String),

    /// The string is not a parseable hostname.
    #[error("not a parseable hostname: {0}")]
    NotAHostname(String),

    /// The hostname has no registrable domain under the Public Suffix List.
    #[error("no registrable domain in: {0}")]
    NoRegistrableDomain(String),
}

/// Failures of the external lookup services consumed during enrichment.
///
/// These are local to a single domain's enrichment and are recorded in the
/// observation; they never propagate as pipeline-level errors.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The lookup did not complete within its time box.
    #[error("{0} lookup timed out")]
    Timeout(&'static str),

    /// The lookup service could not be reached or returned garbage.
    #[error("lookup unavailable: {0}")]
    Unavailable(String),

    /// The service answered but produced nothing usable.
    #[error("lookup returned no usable answer")]
    NoAnswer,

    /// The reputation service requires an API key and none is configured.
    #[error("reputation service API key is not configured")]
    MissingApiKey,

    /// The reputation service returned a non-success HTTP status.
    #[error("reputation service returned HTTP {0}")]
    Status(u16),
}

/// Error types for the durable event sink.
///
/// A sink write failure is pipeline-fatal: the durability guarantee would
/// otherwise be silently violated, so intake halts instead.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Error creating the database file.
    #[error("database file creation error: {0}")]
    FileCreation(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("logger initialization error: {0}")]
    Logger(#[from] SetLoggerError),

    /// Error initializing the HTTP client used for reputation checks.
    #[error("HTTP client initialization error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Error initializing the database pool.
    #[error("database initialization error: {0}")]
    Database(#[from] SinkError),
}

/// Countable pipeline events tracked by [`super::PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum StatKind {
    /// A raw capture event was dropped by the normalizer.
    InvalidDomainDropped,
    /// A schedule attempt found the domain already in progress; skipped.
    DuplicateScheduleSkipped,
    /// IP resolution failed (best-effort, non-fatal to the task).
    IpLookupFailed,
    /// Organization lookup failed (best-effort, non-fatal to the task).
    OrgLookupFailed,
    /// The reputation check failed once and was retried after backoff.
    SafetyCheckRetried,
    /// The reputation check failed terminally (initial attempt plus retry).
    SafetyCheckFailed,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::InvalidDomainDropped => "invalid domains dropped",
            StatKind::DuplicateScheduleSkipped => "duplicate schedule attempts skipped",
            StatKind::IpLookupFailed => "IP lookups failed",
            StatKind::OrgLookupFailed => "organization lookups failed",
            StatKind::SafetyCheckRetried => "safety checks retried",
            StatKind::SafetyCheckFailed => "safety checks failed",
        }
    }
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_stat_kinds_have_string_representation() {
        for kind in StatKind::iter() {
            assert!(!kind.as_str().is_empty(), "{:?} should have a label", kind);
        }
    }

    #[test]
    fn test_invalid_domain_messages_name_the_input() {
        let err = InvalidDomain::IpLiteral("192.168.1.1".into());
        assert!(err.to_string().contains("192.168.1.1"));
        let err = InvalidDomain::NoRegistrableDomain("localhost".into());
        assert!(err.to_string().contains("localhost"));
    }

    #[test]
    fn test_lookup_error_display() {
        assert_eq!(
            LookupError::Timeout("whois").to_string(),
            "whois lookup timed out"
        );
        assert_eq!(
            LookupError::Status(429).to_string(),
            "reputation service returned HTTP 429"
        );
    }
}
