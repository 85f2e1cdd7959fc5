//! Enrichment coordination.
//!
//! For every first sighting the coordinator runs exactly one enrichment task:
//! resolve the IP, look up the owning organization, query the reputation
//! service, then merge the result into the registry and append it to the
//! event log. The registry's Pending->InProgress transition is the in-flight
//! gate; a schedule attempt that loses it is silently skipped.
//!
//! Sub-lookups are failure-isolated: IP and organization are best-effort,
//! and only the safety check decides Complete vs Failed — safety status is
//! the security-relevant field and its absence must be visible, whereas IP
//! and organization are cosmetic. A failed safety check is retried exactly
//! once after a fixed backoff, then the domain settles at Failed for the
//! rest of the run.

mod lookups;
mod safety;
mod whois;

pub use lookups::{LookupServices, NetworkLookups};
pub use safety::SafeBrowsingClient;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error_handling::{PipelineStats, StatKind};
use crate::notify::ChangeNotifier;
use crate::registry::{DomainRegistry, EnrichmentOutcome};
use crate::sink::{DomainEvent, EventSink};

/// Schedules and tracks enrichment tasks.
///
/// Concurrency is bounded by the semaphore; tasks queued beyond the limit
/// wait for a permit inside their own task so scheduling never blocks the
/// capture path.
pub struct EnrichmentCoordinator<L: LookupServices> {
    registry: Arc<DomainRegistry>,
    sink: Arc<EventSink>,
    notifier: ChangeNotifier,
    lookups: Arc<L>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PipelineStats>,
    fatal: CancellationToken,
    retry_backoff: Duration,
    tasks: JoinSet<()>,
}

impl<L: LookupServices> EnrichmentCoordinator<L> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<DomainRegistry>,
        sink: Arc<EventSink>,
        notifier: ChangeNotifier,
        lookups: Arc<L>,
        semaphore: Arc<Semaphore>,
        stats: Arc<PipelineStats>,
        fatal: CancellationToken,
        retry_backoff: Duration,
    ) -> Self {
        EnrichmentCoordinator {
            registry,
            sink,
            notifier,
            lookups,
            semaphore,
            stats,
            fatal,
            retry_backoff,
            tasks: JoinSet::new(),
        }
    }

    /// Schedules one enrichment task for `domain`.
    ///
    /// No-op if the domain is not Pending: either another scheduler already
    /// claimed it or enrichment already finished. Not an error.
    pub fn schedule(&mut self, domain: String) {
        if !self.registry.mark_in_progress(&domain) {
            self.stats.increment(StatKind::DuplicateScheduleSkipped);
            log::debug!("Enrichment for {domain} already scheduled; skipping");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        let notifier = self.notifier.clone();
        let lookups = Arc::clone(&self.lookups);
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        let fatal = self.fatal.clone();
        let retry_backoff = self.retry_backoff;

        self.tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed during shutdown
            };

            let outcome = enrich(lookups.as_ref(), &domain, retry_backoff, &stats).await;

            let (ip, organization, safety) = match &outcome {
                EnrichmentOutcome::Complete {
                    ip,
                    organization,
                    safety,
                } => (*ip, organization.clone(), *safety),
                EnrichmentOutcome::Failed { ip, organization } => (
                    *ip,
                    organization.clone(),
                    crate::registry::SafetyStatus::LookupFailed,
                ),
            };

            registry.merge(&domain, outcome);

            let event = DomainEvent::EnrichmentCompleted {
                domain: domain.clone(),
                ip,
                organization,
                safety,
                at: chrono::Utc::now().timestamp_millis(),
            };
            if let Err(e) = sink.append(&event).await {
                log::error!("Event sink write failed for {domain}: {e}; halting pipeline");
                fatal.cancel();
                return;
            }

            notifier.publish(&domain);
        });
    }

    /// Waits for in-flight tasks to finish, aborting whatever is still
    /// running once the grace period expires. After this returns no
    /// enrichment task is running.
    pub async fn drain(mut self, grace: Duration) {
        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        log::warn!("Enrichment task panicked: {e}");
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            log::warn!(
                "{} enrichment task(s) did not finish within the {:?} grace period; aborting",
                self.tasks.len(),
                grace
            );
            self.tasks.shutdown().await;
        }
    }
}

/// Runs the three sub-lookups for one domain.
///
/// IP and organization failures are recorded in stats and logged, never
/// propagated. The safety check gets one retry after `retry_backoff`.
async fn enrich<L: LookupServices>(
    lookups: &L,
    domain: &str,
    retry_backoff: Duration,
    stats: &PipelineStats,
) -> EnrichmentOutcome {
    let ip = match lookups.resolve_ip(domain).await {
        Ok(ip) => Some(ip),
        Err(e) => {
            stats.increment(StatKind::IpLookupFailed);
            log::debug!("IP resolution failed for {domain}: {e}");
            None
        }
    };

    let organization = match lookups.lookup_org(domain).await {
        Ok(org) => Some(org),
        Err(e) => {
            stats.increment(StatKind::OrgLookupFailed);
            log::debug!("Organization lookup failed for {domain}: {e}");
            None
        }
    };

    let safety = match lookups.check_reputation(domain).await {
        Ok(status) => Ok(status),
        Err(first) => {
            stats.increment(StatKind::SafetyCheckRetried);
            log::debug!("Safety check failed for {domain}: {first}; retrying once");
            tokio::time::sleep(retry_backoff).await;
            lookups.check_reputation(domain).await
        }
    };

    match safety {
        Ok(status) => EnrichmentOutcome::Complete {
            ip,
            organization,
            safety: status,
        },
        Err(e) => {
            stats.increment(StatKind::SafetyCheckFailed);
            log::warn!("Safety check failed terminally for {domain}: {e}");
            EnrichmentOutcome::Failed { ip, organization }
        }
    }
}
