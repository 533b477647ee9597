//! Connection pool creation and configuration.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,

    /// How long a caller waits for a free connection when the pool is
    /// saturated, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 10,
            acquire_timeout_ms: 30_000,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when talking to the pool itself.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No connection could be checked out of the pool.
    #[error("failed to acquire a database connection: {0}")]
    Acquire(#[from] r2d2::Error),
}

/// Creates a new SQLite connection pool with WAL mode and foreign keys enabled.
///
/// The pool opens connections on demand; building it never fails, even when
/// the database file cannot be opened. Use [`check_connectivity`] to verify
/// the store is reachable.
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file. `:memory:` gives every
///   pooled connection its own private database, so tests that need shared
///   state across connections should use a temporary file instead.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> DbPool {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            // In-memory databases report "memory", which is fine.
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!(
                        "failed to set WAL journal mode, got: {}",
                        journal_mode
                    )),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = {};",
                settings.busy_timeout_ms
            ))
        });

    Pool::builder()
        .max_size(settings.pool_max_size)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .build_unchecked(manager)
}

/// Checks out one connection and hands it straight back.
///
/// Used once at startup to confirm the store answers. The result is meant to
/// be logged; an unreachable store is not a reason to stop serving.
///
/// # Errors
///
/// Returns `PoolError::Acquire` if no connection could be opened within the
/// pool's acquire timeout.
pub fn check_connectivity(pool: &DbPool) -> Result<(), PoolError> {
    let conn = pool.get()?;
    drop(conn);
    tracing::debug!("database connectivity check succeeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_file_pool_applies_settings() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("pool.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
            acquire_timeout_ms: 1_000,
        };

        let pool = create_pool(path.to_str().expect("utf-8 path"), settings);
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert_eq!(mode, "wal");

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("should query foreign_keys");
        assert_eq!(fk, 1, "foreign keys should be enabled");

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500, "busy timeout should match settings");

        assert_eq!(pool.max_size(), 3, "pool max size should match settings");
    }

    #[test]
    fn connectivity_check_succeeds_for_writable_path() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("check.db");
        let pool = create_pool(path.to_str().expect("utf-8 path"), DbRuntimeSettings::default());

        check_connectivity(&pool).expect("connectivity check should succeed");
        assert!(path.exists(), "connectivity check should have created the database file");
    }

    #[test]
    fn connectivity_check_fails_for_unreachable_path() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("missing-dir").join("check.db");
        let settings = DbRuntimeSettings {
            acquire_timeout_ms: 200,
            ..DbRuntimeSettings::default()
        };
        let pool = create_pool(path.to_str().expect("utf-8 path"), settings);

        let err = check_connectivity(&pool).expect_err("connectivity check should fail");
        assert!(matches!(err, PoolError::Acquire(_)));
    }
}
