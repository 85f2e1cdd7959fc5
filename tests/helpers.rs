// Shared test helpers for database setup.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use sqlx::SqlitePool;
use std::path::PathBuf;

use domain_watch::run_migrations;

/// Creates a test database pool with migrations applied.
/// Uses an in-memory database for fast test execution.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates a test database pool from a file path.
/// Useful for tests that need persistence or specific database files.
/// If the database file already exists, it will be reused (not truncated).
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool_with_path(db_path: &PathBuf) -> SqlitePool {
    // Create the database file first (SQLite requires the file to exist or be created)
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    // Use OpenOptions to avoid truncating existing database files
    std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .read(true)
        .open(db_path)
        .expect("Failed to create/open database file");

    let db_path_str = db_path.to_string_lossy().to_string();
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", db_path_str))
        .await
        .expect("Failed to create test database");

    // Only run migrations if the database is new (check if domain_events table exists)
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='domain_events'",
    )
    .fetch_one(&pool)
    .await
    .map(|count: i64| count > 0)
    .unwrap_or(false);

    if !table_exists {
        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
    }

    pool
}
