//! domain_watch library: domain observation pipeline
//!
//! Ingests a stream of raw DNS query events, normalizes each query name to a
//! canonical registrable domain, and maintains a live deduplicated registry
//! of first-seen/last-seen observations. New domains are enriched
//! asynchronously (IP address, WHOIS organization, reputation check) without
//! ever blocking the capture path, every new observation and completed
//! enrichment is durably appended to a SQLite event log, and registry changes
//! are broadcast to subscribers by domain key.
//!
//! # Example
//!
//! ```no_run
//! use domain_watch::{capture, run_monitor, Config, MonitorHandle, RawQuery};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let (tx, rx) = capture::channel(1024);
//! let handle = MonitorHandle::new();
//!
//! tx.send(RawQuery::now("www.example.com")).await?;
//! drop(tx); // closing the capture feed ends the run
//!
//! let report = run_monitor(config, rx, handle.token()).await?;
//! println!("{} domains observed", report.unique_domains);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

pub mod app;
pub mod capture;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod error_handling;
pub mod initialization;
pub mod notify;
pub mod registry;
pub mod sink;

// Re-export public API
pub use capture::RawQuery;
pub use config::{Config, LogFormat, LogLevel};
pub use domain::normalize_domain;
pub use enrichment::{EnrichmentCoordinator, LookupServices, NetworkLookups};
pub use error_handling::{PipelineStats, StatKind};
pub use notify::ChangeNotifier;
pub use registry::{DomainRegistry, EnrichmentOutcome, EnrichmentState, Observation, SafetyStatus};
pub use run::{run_monitor, run_monitor_with, MonitorHandle, MonitorReport};
pub use sink::{init_db_pool_with_path, run_migrations, DomainEvent, EventRow, EventSink};

// Internal run module (contains the main pipeline wiring)
mod run {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::app::{log_progress, shutdown_gracefully};
    use crate::capture::RawQuery;
    use crate::config::{Config, LOGGING_INTERVAL_SECS, NOTIFY_CHANNEL_CAPACITY};
    use crate::domain::normalize_domain;
    use crate::enrichment::{EnrichmentCoordinator, LookupServices, NetworkLookups};
    use crate::error_handling::{PipelineStats, StatKind};
    use crate::initialization::{init_resolver, init_semaphore};
    use crate::notify::ChangeNotifier;
    use crate::registry::{DomainRegistry, EnrichmentState};
    use crate::sink::{init_db_pool_with_path, run_migrations, DomainEvent, EventSink};

    /// Shutdown control for a monitor run.
    ///
    /// Calling [`stop`](MonitorHandle::stop) triggers the cooperative
    /// shutdown sequence: intake stops accepting capture events, in-flight
    /// enrichment drains within the configured grace period, the event log is
    /// checkpointed, and `run_monitor` returns.
    #[derive(Clone)]
    pub struct MonitorHandle {
        cancel: CancellationToken,
    }

    impl MonitorHandle {
        pub fn new() -> Self {
            MonitorHandle {
                cancel: CancellationToken::new(),
            }
        }

        /// Requests a cooperative shutdown.
        pub fn stop(&self) {
            self.cancel.cancel();
        }

        /// The token `run_monitor` watches for shutdown.
        pub fn token(&self) -> CancellationToken {
            self.cancel.clone()
        }
    }

    impl Default for MonitorHandle {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Results of a completed monitor run.
    #[derive(Debug, Clone)]
    pub struct MonitorReport {
        /// Raw capture events received
        pub events: usize,
        /// Events dropped by the normalizer
        pub dropped: usize,
        /// Distinct canonical domains observed
        pub unique_domains: usize,
        /// Domains whose enrichment completed
        pub enriched: usize,
        /// Domains whose enrichment failed terminally
        pub enrichment_failures: usize,
        /// Path to the SQLite event log
        pub db_path: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the domain observation pipeline with production lookup services.
    ///
    /// Consumes raw capture events from `events` until the channel closes or
    /// `shutdown` fires, then drains enrichment and returns a report.
    ///
    /// # Errors
    ///
    /// Returns an error if database or lookup-service initialization fails,
    /// or if an event log write fails mid-run (the durability guarantee makes
    /// that pipeline-fatal: intake halts rather than losing history).
    pub async fn run_monitor(
        config: Config,
        events: mpsc::Receiver<RawQuery>,
        shutdown: CancellationToken,
    ) -> Result<MonitorReport> {
        let registry = Arc::new(DomainRegistry::new());
        let notifier = ChangeNotifier::new(NOTIFY_CHANNEL_CAPACITY);
        let resolver = init_resolver();
        let lookups = NetworkLookups::new(&config, resolver)
            .context("Failed to initialize lookup services")?;
        run_monitor_with(config, registry, notifier, events, shutdown, lookups).await
    }

    /// Runs the pipeline with caller-provided registry, notifier, and lookup
    /// services.
    ///
    /// The registry and notifier are shared with rendering/export
    /// collaborators: subscribe to the notifier before starting the run, and
    /// pull current state via [`DomainRegistry::snapshot`] or point lookups
    /// when a key arrives.
    pub async fn run_monitor_with<L: LookupServices>(
        config: Config,
        registry: Arc<DomainRegistry>,
        notifier: ChangeNotifier,
        mut events: mpsc::Receiver<RawQuery>,
        shutdown: CancellationToken,
        lookups: L,
    ) -> Result<MonitorReport> {
        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let sink = Arc::new(EventSink::new(Arc::clone(&pool)));
        let semaphore = init_semaphore(config.max_concurrency);
        let stats = Arc::new(PipelineStats::new());
        let fatal = CancellationToken::new();

        let mut coordinator = EnrichmentCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&sink),
            notifier.clone(),
            Arc::new(lookups),
            semaphore,
            Arc::clone(&stats),
            fatal.clone(),
            config.retry_backoff(),
        );

        let start_time = std::time::Instant::now();
        let events_seen = Arc::new(AtomicUsize::new(0));

        let cancel = CancellationToken::new();
        let cancel_logging = cancel.child_token();
        let logging_registry = Arc::clone(&registry);
        let logging_stats = Arc::clone(&stats);
        let logging_events = Arc::clone(&events_seen);
        let logging_task = Some(tokio::task::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(LOGGING_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        log_progress(start_time, &logging_events, &logging_registry, &logging_stats);
                    }
                    _ = cancel_logging.cancelled() => {
                        break;
                    }
                }
            }
        }));

        info!(
            "Starting domain monitor (event log: {})",
            config.db_path.display()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested; no longer accepting capture events");
                    break;
                }
                _ = fatal.cancelled() => {
                    break;
                }
                maybe_event = events.recv() => {
                    let Some(raw) = maybe_event else {
                        info!("Capture source closed; stopping intake");
                        break;
                    };
                    events_seen.fetch_add(1, Ordering::SeqCst);

                    let canonical = match normalize_domain(&raw.name) {
                        Ok(domain) => domain,
                        Err(e) => {
                            stats.increment(StatKind::InvalidDomainDropped);
                            log::debug!("Dropping capture event {:?}: {e}", raw.name);
                            continue;
                        }
                    };

                    let (_, is_new) = registry.upsert(&canonical, raw.timestamp_millis);
                    if is_new {
                        info!("New domain observed: {canonical}");
                        let event = DomainEvent::NewObservation {
                            domain: canonical.clone(),
                            first_seen: raw.timestamp_millis,
                        };
                        if let Err(e) = sink.append(&event).await {
                            log::error!(
                                "Event log write failed for {canonical}: {e}; halting intake"
                            );
                            fatal.cancel();
                            break;
                        }
                        coordinator.schedule(canonical.clone());
                    }
                    notifier.publish(&canonical);
                }
            }
        }

        // Stop accepting capture events, then let in-flight enrichment
        // finish within the grace period.
        drop(events);
        coordinator.drain(config.shutdown_grace()).await;
        shutdown_gracefully(cancel, logging_task).await;

        if let Err(e) = sink.checkpoint().await {
            log::warn!("Failed to checkpoint WAL file (this is non-critical): {e}");
        }

        log_progress(start_time, &events_seen, &registry, &stats);
        stats.log_summary();

        let snapshot = registry.snapshot();
        let enriched = snapshot
            .iter()
            .filter(|o| o.enrichment == EnrichmentState::Complete)
            .count();
        let enrichment_failures = snapshot
            .iter()
            .filter(|o| o.enrichment == EnrichmentState::Failed)
            .count();

        let report = MonitorReport {
            events: events_seen.load(Ordering::SeqCst),
            dropped: stats.get(StatKind::InvalidDomainDropped),
            unique_domains: snapshot.len(),
            enriched,
            enrichment_failures,
            db_path: config.db_path.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        };

        if fatal.is_cancelled() {
            return Err(anyhow::anyhow!(
                "event log write failed; intake halted to preserve the durability guarantee"
            ));
        }

        Ok(report)
    }
}
