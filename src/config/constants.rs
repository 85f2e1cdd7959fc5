//! Configuration constants.
//!
//! Defaults for timeouts, capacities, and the reputation service endpoint.

use std::time::Duration;

/// Default SQLite database path for the event log.
pub const DB_PATH: &str = "./domain_watch.db";

/// Default number of concurrent enrichment workers (semaphore limit).
pub const ENRICHMENT_WORKERS: usize = 8;

/// Capacity of the raw capture event channel. Capture producers only block
/// once this many events are queued behind a stalled intake loop.
pub const CAPTURE_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the change-notification broadcast channel. Slow subscribers
/// past this lag miss intermediate keys and re-sync from a snapshot.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 256;

/// Interval between progress log lines, in seconds.
pub const LOGGING_INTERVAL_SECS: u64 = 5;

// Network operation timeouts.
/// DNS query timeout in seconds. Most queries complete in under a second;
/// failing fast keeps workers available for other domains.
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// WHOIS lookup timeout in seconds (covers the IANA referral hop plus the
/// registry server query).
pub const WHOIS_TIMEOUT_SECS: u64 = 8;
/// Reputation check timeout in seconds.
pub const SAFETY_TIMEOUT_SECS: u64 = 5;

/// Fixed backoff before the single retry of a failed safety check.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Grace period for in-flight enrichment tasks during shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// WHOIS protocol port.
pub const WHOIS_PORT: u16 = 43;

/// IANA WHOIS server, queried for the referral to the TLD registry server.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

/// Google Safe Browsing v4 threat-match endpoint.
pub const SAFE_BROWSING_ENDPOINT: &str =
    "https://safebrowsing.googleapis.com/v4/threatMatches:find";

/// Threat types submitted with every reputation check.
pub const SAFE_BROWSING_THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];
