// End-to-end pipeline tests.
//
// These drive `run_monitor_with` through the public API with stubbed lookup
// services: raw events go in through the capture channel, and assertions read
// back the registry, the event log, and the change notifications. Closing the
// capture channel ends each run deterministically.

mod helpers;

use std::future::Future;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use domain_watch::error_handling::LookupError;
use domain_watch::{
    capture, run_monitor_with, ChangeNotifier, Config, DomainRegistry, EnrichmentState, EventSink,
    LookupServices, RawQuery, SafetyStatus,
};

/// Lookup stub returning the same canned answers for every domain.
#[derive(Clone)]
struct StaticLookups {
    ip: Option<IpAddr>,
    org: Option<String>,
    safety: Option<SafetyStatus>,
}

impl StaticLookups {
    fn safe() -> Self {
        StaticLookups {
            ip: Some("93.184.216.34".parse().unwrap()),
            org: Some("Example Org".into()),
            safety: Some(SafetyStatus::Safe),
        }
    }
}

impl LookupServices for StaticLookups {
    fn resolve_ip(
        &self,
        _domain: &str,
    ) -> impl Future<Output = Result<IpAddr, LookupError>> + Send {
        let result = self.ip.ok_or(LookupError::NoAnswer);
        async move { result }
    }

    fn lookup_org(
        &self,
        _domain: &str,
    ) -> impl Future<Output = Result<String, LookupError>> + Send {
        let result = self.org.clone().ok_or(LookupError::NoAnswer);
        async move { result }
    }

    fn check_reputation(
        &self,
        _domain: &str,
    ) -> impl Future<Output = Result<SafetyStatus, LookupError>> + Send {
        let result = self
            .safety
            .clone()
            .ok_or_else(|| LookupError::Unavailable("reputation service down".into()));
        async move { result }
    }
}

struct TestRun {
    _dir: TempDir,
    config: Config,
    db_path: PathBuf,
    registry: Arc<DomainRegistry>,
    notifier: ChangeNotifier,
}

fn test_run() -> TestRun {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("watch.db");
    let config = Config {
        db_path: db_path.clone(),
        retry_backoff_seconds: 0,
        shutdown_grace_seconds: 5,
        ..Config::default()
    };
    TestRun {
        _dir: dir,
        config,
        db_path,
        registry: Arc::new(DomainRegistry::new()),
        notifier: ChangeNotifier::new(64),
    }
}

#[tokio::test]
async fn test_duplicate_queries_collapse_to_one_observation() {
    let run = test_run();
    let (tx, rx) = capture::channel(16);

    // Same registrable domain in three spellings, out of nothing but case
    // and a trailing dot.
    tx.send(RawQuery {
        name: "www.Example.COM.".into(),
        timestamp_millis: 1_000,
    })
    .await
    .unwrap();
    tx.send(RawQuery {
        name: "example.com".into(),
        timestamp_millis: 2_000,
    })
    .await
    .unwrap();
    tx.send(RawQuery {
        name: "api.example.com".into(),
        timestamp_millis: 3_000,
    })
    .await
    .unwrap();
    drop(tx);

    let report = run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        StaticLookups::safe(),
    )
    .await
    .expect("run failed");

    assert_eq!(report.events, 3);
    assert_eq!(report.unique_domains, 1);
    assert_eq!(report.enriched, 1);

    let obs = run.registry.get("example.com").expect("missing observation");
    assert_eq!(obs.visit_count, 3);
    assert_eq!(obs.first_seen, 1_000);
    assert_eq!(obs.last_seen, 3_000);
    assert_eq!(obs.enrichment, EnrichmentState::Complete);
    assert_eq!(obs.organization.as_deref(), Some("Example Org"));

    // Exactly one new_observation row despite three capture events.
    let pool = helpers::create_test_pool_with_path(&run.db_path).await;
    let sink = EventSink::new(Arc::new(pool));
    let rows = sink.events_for_domain("example.com").await.unwrap();
    assert_eq!(rows[0].event_kind, "new_observation");
    assert_eq!(rows[0].timestamp, 1_000);
    assert_eq!(
        rows.iter()
            .filter(|r| r.event_kind == "new_observation")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_unsafe_verdict_is_recorded() {
    let run = test_run();
    let (tx, rx) = capture::channel(16);
    tx.send(RawQuery::now("malware.test")).await.unwrap();
    drop(tx);

    let lookups = StaticLookups {
        safety: Some(SafetyStatus::Unsafe),
        ..StaticLookups::safe()
    };
    run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        lookups,
    )
    .await
    .expect("run failed");

    let obs = run.registry.get("malware.test").unwrap();
    assert_eq!(obs.safety, SafetyStatus::Unsafe);
    assert_eq!(obs.enrichment, EnrichmentState::Complete);

    let pool = helpers::create_test_pool_with_path(&run.db_path).await;
    let sink = EventSink::new(Arc::new(pool));
    let rows = sink.events_for_domain("malware.test").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].event_kind, "enrichment_completed");
    assert_eq!(rows[1].safety_status.as_deref(), Some("unsafe"));
}

#[tokio::test]
async fn test_failed_reputation_marks_lookup_failed() {
    let run = test_run();
    let (tx, rx) = capture::channel(16);
    tx.send(RawQuery::now("flaky.test")).await.unwrap();
    drop(tx);

    let lookups = StaticLookups {
        safety: None,
        ..StaticLookups::safe()
    };
    let report = run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        lookups,
    )
    .await
    .expect("run failed");

    assert_eq!(report.enriched, 0);
    assert_eq!(report.enrichment_failures, 1);

    let obs = run.registry.get("flaky.test").unwrap();
    assert_eq!(obs.enrichment, EnrichmentState::Failed);
    assert_eq!(obs.safety, SafetyStatus::LookupFailed);
    // Best-effort fields survive a failed reputation check.
    assert!(obs.ip_address.is_some());

    let pool = helpers::create_test_pool_with_path(&run.db_path).await;
    let sink = EventSink::new(Arc::new(pool));
    let rows = sink.events_for_domain("flaky.test").await.unwrap();
    assert_eq!(rows[1].safety_status.as_deref(), Some("lookup_failed"));
}

#[tokio::test]
async fn test_invalid_names_are_dropped() {
    let run = test_run();
    let (tx, rx) = capture::channel(16);
    tx.send(RawQuery::now("localhost")).await.unwrap();
    tx.send(RawQuery::now("192.168.0.1")).await.unwrap();
    tx.send(RawQuery::now("news.bbc.co.uk")).await.unwrap();
    drop(tx);

    let report = run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        StaticLookups::safe(),
    )
    .await
    .expect("run failed");

    assert_eq!(report.events, 3);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.unique_domains, 1);
    assert!(run.registry.get("bbc.co.uk").is_some());
}

#[tokio::test]
async fn test_subscribers_receive_change_keys() {
    let run = test_run();
    let mut rx_changes = run.notifier.subscribe();
    let (tx, rx) = capture::channel(16);
    tx.send(RawQuery::now("example.com")).await.unwrap();
    tx.send(RawQuery::now("www.example.com")).await.unwrap();
    drop(tx);

    run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        StaticLookups::safe(),
    )
    .await
    .expect("run failed");

    // Two upserts plus one enrichment completion, all for the same key.
    let mut keys = Vec::new();
    while let Ok(key) = rx_changes.try_recv() {
        keys.push(key);
    }
    assert!(keys.len() >= 3);
    assert!(keys.iter().all(|k| k == "example.com"));
}

#[tokio::test]
async fn test_sink_failure_aborts_run() {
    let run = test_run();

    // Apply migrations, then knock the table out from under the pipeline.
    // The migrator records the migration as applied, so the run will not
    // recreate it and the first append must fail.
    {
        let pool = helpers::create_test_pool_with_path(&run.db_path).await;
        sqlx::query("DROP TABLE domain_events")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let (tx, rx) = capture::channel(16);
    tx.send(RawQuery::now("example.com")).await.unwrap();
    drop(tx);

    let result = run_monitor_with(
        run.config,
        Arc::clone(&run.registry),
        run.notifier.clone(),
        rx,
        CancellationToken::new(),
        StaticLookups::safe(),
    )
    .await;

    assert!(result.is_err());
}
