//! The domain observation registry.
//!
//! A concurrent map from canonical domain to [`Observation`], the mutable
//! "current truth" of the pipeline (the event sink holds the immutable
//! history). All mutating operations are atomic per key and hold the lock for
//! O(1) work, so the capture path never waits on enrichment.
//!
//! The `Pending -> InProgress` transition in [`DomainRegistry::mark_in_progress`]
//! is the synchronization point that guarantees at most one concurrent
//! enrichment per domain: only the caller that wins the transition proceeds.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;

use serde::Serialize;

/// Reputation verdict for a domain.
///
/// `Unknown` and `LookupFailed` must be visually distinguishable from `Safe`
/// by consumers: "no flag" never means "verified safe".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SafetyStatus {
    /// Not yet checked.
    Unknown,
    /// Reputation service reported no threat match.
    Safe,
    /// Reputation service reported a threat match.
    Unsafe,
    /// The check could not be completed for this run.
    LookupFailed,
}

impl SafetyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Unknown => "unknown",
            SafetyStatus::Safe => "safe",
            SafetyStatus::Unsafe => "unsafe",
            SafetyStatus::LookupFailed => "lookup_failed",
        }
    }
}

/// Enrichment lifecycle for a domain. Transitions are forward-only:
/// Pending -> InProgress -> Complete | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnrichmentState {
    /// Created by first sighting; no task has claimed it yet.
    Pending,
    /// Exactly one enrichment task is working on this domain.
    InProgress,
    /// Safety check succeeded (IP/org are best-effort).
    Complete,
    /// Safety check failed after the retry; terminal for this run.
    Failed,
}

/// Per-domain record of sighting and enrichment state; the registry value.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    /// Canonical registrable domain; unique across the registry.
    pub domain: String,
    /// Resolved lazily by enrichment.
    pub ip_address: Option<IpAddr>,
    /// Resolved lazily via WHOIS.
    pub organization: Option<String>,
    pub safety: SafetyStatus,
    /// Epoch milliseconds; `first_seen <= last_seen` always.
    pub first_seen: i64,
    pub last_seen: i64,
    /// Number of valid sightings; at least 1.
    pub visit_count: u64,
    pub enrichment: EnrichmentState,
}

/// Result of one enrichment task, merged back into the registry.
#[derive(Debug, Clone)]
pub enum EnrichmentOutcome {
    /// The safety check succeeded; IP and organization carry whatever the
    /// best-effort sub-lookups produced.
    Complete {
        ip: Option<IpAddr>,
        organization: Option<String>,
        safety: SafetyStatus,
    },
    /// The safety check failed terminally. Partial IP/org results are still
    /// kept; the safety field records the failure.
    Failed {
        ip: Option<IpAddr>,
        organization: Option<String>,
    },
}

/// Concurrent map from canonical domain to [`Observation`].
///
/// Observations are created on first sighting and never deleted during a
/// run; registry lifetime equals process lifetime.
pub struct DomainRegistry {
    inner: Mutex<HashMap<String, Observation>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        DomainRegistry {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Records a sighting of `domain` at `timestamp`.
    ///
    /// If the domain is unknown, creates an observation with visit_count 1,
    /// `first_seen == last_seen == timestamp`, state Pending, and returns
    /// `is_new = true`. Otherwise increments visit_count, advances last_seen
    /// to `max(last_seen, timestamp)` (capture events arrive unordered), and
    /// returns `is_new = false`. Never blocks on enrichment.
    pub fn upsert(&self, domain: &str, timestamp: i64) -> (Observation, bool) {
        let mut map = self.inner.lock().expect("registry lock poisoned");
        match map.get_mut(domain) {
            Some(obs) => {
                obs.visit_count += 1;
                obs.last_seen = obs.last_seen.max(timestamp);
                (obs.clone(), false)
            }
            None => {
                let obs = Observation {
                    domain: domain.to_string(),
                    ip_address: None,
                    organization: None,
                    safety: SafetyStatus::Unknown,
                    first_seen: timestamp,
                    last_seen: timestamp,
                    visit_count: 1,
                    enrichment: EnrichmentState::Pending,
                };
                map.insert(domain.to_string(), obs.clone());
                (obs, true)
            }
        }
    }

    /// Atomically transitions `domain` from Pending to InProgress.
    ///
    /// Returns false (no-op) if the domain is missing or not Pending; this
    /// guards against double-scheduling under racing upserts.
    pub fn mark_in_progress(&self, domain: &str) -> bool {
        let mut map = self.inner.lock().expect("registry lock poisoned");
        match map.get_mut(domain) {
            Some(obs) if obs.enrichment == EnrichmentState::Pending => {
                obs.enrichment = EnrichmentState::InProgress;
                true
            }
            _ => false,
        }
    }

    /// Merges an enrichment outcome into `domain`.
    ///
    /// Fills ip/organization/safety and advances the state to Complete or
    /// Failed. A missing domain or an already-terminal state is tolerated as
    /// a no-op: a late result must never corrupt state.
    pub fn merge(&self, domain: &str, outcome: EnrichmentOutcome) {
        let mut map = self.inner.lock().expect("registry lock poisoned");
        let Some(obs) = map.get_mut(domain) else {
            log::warn!("Enrichment result for unknown domain {domain}; ignoring");
            return;
        };
        if matches!(
            obs.enrichment,
            EnrichmentState::Complete | EnrichmentState::Failed
        ) {
            return;
        }
        match outcome {
            EnrichmentOutcome::Complete {
                ip,
                organization,
                safety,
            } => {
                obs.ip_address = ip;
                obs.organization = organization;
                obs.safety = safety;
                obs.enrichment = EnrichmentState::Complete;
            }
            EnrichmentOutcome::Failed { ip, organization } => {
                obs.ip_address = ip;
                obs.organization = organization;
                obs.safety = SafetyStatus::LookupFailed;
                obs.enrichment = EnrichmentState::Failed;
            }
        }
    }

    /// Point lookup for notifier subscribers.
    pub fn get(&self, domain: &str) -> Option<Observation> {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .get(domain)
            .cloned()
    }

    /// Point-in-time copy of all observations, ordered by domain.
    ///
    /// Each observation is internally consistent; the snapshot never reflects
    /// a partial write.
    pub fn snapshot(&self) -> Vec<Observation> {
        let map = self.inner.lock().expect("registry lock poisoned");
        let mut observations: Vec<Observation> = map.values().cloned().collect();
        observations.sort_by(|a, b| a.domain.cmp(&b.domain));
        observations
    }

    /// Number of distinct canonical domains observed.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
