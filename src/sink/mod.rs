//! Durable event sink.
//!
//! An append-only SQLite event log holding one row per new observation and
//! per completed enrichment. Each append is executed to completion before the
//! call returns; this is the pipeline's durability boundary, so callers
//! upstream need no recovery logic of their own. An append failure is
//! pipeline-fatal (intake halts rather than silently losing history).
//!
//! Rows for the same domain appear in the order they logically occurred:
//! `new_observation` strictly precedes its `enrichment_completed`.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::sync::Arc;

use log::{error, info};
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::error_handling::SinkError;
use crate::registry::SafetyStatus;

const KIND_NEW_OBSERVATION: &str = "new_observation";
const KIND_ENRICHMENT_COMPLETED: &str = "enrichment_completed";

/// One event appended to the durable log.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A canonical domain was seen for the first time this run.
    NewObservation { domain: String, first_seen: i64 },
    /// An enrichment task reached a terminal state for a domain.
    EnrichmentCompleted {
        domain: String,
        ip: Option<IpAddr>,
        organization: Option<String>,
        safety: SafetyStatus,
        at: i64,
    },
}

impl DomainEvent {
    pub fn domain(&self) -> &str {
        match self {
            DomainEvent::NewObservation { domain, .. } => domain,
            DomainEvent::EnrichmentCompleted { domain, .. } => domain,
        }
    }
}

/// A materialized event log row, as read back by consumers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub domain: String,
    pub event_kind: String,
    pub timestamp: i64,
    pub ip: Option<String>,
    pub organization: Option<String>,
    pub safety_status: Option<String>,
}

/// Append-only event log backed by SQLite.
///
/// Safe under concurrent callers: sqlx serializes writes through the pool and
/// SQLite's WAL journal.
pub struct EventSink {
    pub(crate) pool: Arc<SqlitePool>,
}

impl EventSink {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        EventSink { pool }
    }

    /// Appends one event, returning only after the row is durably committed.
    pub async fn append(&self, event: &DomainEvent) -> Result<(), SinkError> {
        match event {
            DomainEvent::NewObservation { domain, first_seen } => {
                sqlx::query(
                    "INSERT INTO domain_events (domain, event_kind, timestamp) VALUES (?, ?, ?)",
                )
                .bind(domain)
                .bind(KIND_NEW_OBSERVATION)
                .bind(first_seen)
                .execute(self.pool.as_ref())
                .await?;
            }
            DomainEvent::EnrichmentCompleted {
                domain,
                ip,
                organization,
                safety,
                at,
            } => {
                sqlx::query(
                    "INSERT INTO domain_events \
                     (domain, event_kind, timestamp, ip, organization, safety_status) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(domain)
                .bind(KIND_ENRICHMENT_COMPLETED)
                .bind(at)
                .bind(ip.map(|ip| ip.to_string()))
                .bind(organization)
                .bind(safety.as_str())
                .execute(self.pool.as_ref())
                .await?;
            }
        }
        Ok(())
    }

    /// All events for `domain` in append order. Report exporters read this as
    /// the source of truth for "what happened when".
    pub async fn events_for_domain(&self, domain: &str) -> Result<Vec<EventRow>, SinkError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT domain, event_kind, timestamp, ip, organization, safety_status \
             FROM domain_events WHERE domain = ? ORDER BY id",
        )
        .bind(domain)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows)
    }

    /// Truncates the WAL into the main database file. Called at shutdown so a
    /// post-run reader sees everything without replaying the WAL.
    pub async fn checkpoint(&self) -> Result<(), SinkError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

/// Initializes and returns a database connection pool.
///
/// Creates the database file if it doesn't exist and enables WAL mode for
/// concurrent access from intake and enrichment workers.
pub async fn init_db_pool_with_path(
    db_path: &std::path::Path,
) -> Result<Arc<Pool<Sqlite>>, SinkError> {
    let db_path_str = db_path.to_string_lossy().to_string();
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&db_path_str)
    {
        Ok(_) => info!("Database file created successfully."),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            info!("Database file already exists.")
        }
        Err(e) => {
            error!("Failed to create database file: {e}");
            return Err(SinkError::FileCreation(e.to_string()));
        }
    }

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            SinkError::Sql(e)
        })?;

    // Enable WAL mode
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!("Failed to set WAL mode: {e}");
            SinkError::Sql(e)
        })?;

    Ok(Arc::new(pool))
}

/// Runs SQLx migrations located in the `migrations/` directory.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), anyhow::Error> {
    let migrations_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir.as_path()).await?;
    migrator.run(pool).await?;
    Ok(())
}
