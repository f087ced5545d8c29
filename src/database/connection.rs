use std::time::Duration;

use anyhow::{Context, Result};
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::DatabaseSettings;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub fn create_pool(settings: &DatabaseSettings) -> Result<DbPool> {
    let manager = build_manager(&settings.path, settings.busy_timeout_ms);
    build_pool(manager, settings.pool_size)
}

/// Single-connection pool over a private in-memory database.
pub fn create_memory_pool() -> Result<DbPool> {
    let manager = with_pragmas(SqliteConnectionManager::memory(), 0);
    build_pool(manager, 1)
}

fn build_manager(path: &str, busy_timeout_ms: u64) -> SqliteConnectionManager {
    with_pragmas(SqliteConnectionManager::file(path), busy_timeout_ms)
}

fn with_pragmas(manager: SqliteConnectionManager, busy_timeout_ms: u64) -> SqliteConnectionManager {
    manager.with_init(move |conn| {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    })
}

fn build_pool(manager: SqliteConnectionManager, size: u32) -> Result<DbPool> {
    r2d2::Pool::builder()
        .max_size(size)
        .build(manager)
        .context("Failed to create database connection pool")
}

pub fn get_connection(pool: &DbPool) -> Result<DbConn> {
    pool.get()
        .context("Failed to get database connection from pool")
}
