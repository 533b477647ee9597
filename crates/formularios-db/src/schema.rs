//! Schema bootstrap for the four formularios tables.
//!
//! The schema is a short list of embedded SQL steps. The number of steps
//! already applied lives in SQLite's `user_version` header field, so a store
//! created by an older build is brought forward and a current one is left
//! untouched. Each step and its version bump commit together.

use rusqlite::Connection;
use thiserror::Error;

/// Embedded schema steps; step `n` (1-based) brings the store to version `n`.
const STEPS: &[&str] = &[
    include_str!("schema/v1_usuarios_empresas.sql"),
    include_str!("schema/v2_formularios.sql"),
];

/// Schema version a fully bootstrapped store reports.
pub const SCHEMA_VERSION: u32 = STEPS.len() as u32;

/// Errors raised while bootstrapping the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema version: {0}")]
    Version(#[source] rusqlite::Error),

    #[error("store reports schema version {found}, newer than supported {}", SCHEMA_VERSION)]
    TooNew { found: u32 },

    #[error("schema step v{version} failed: {source}")]
    Step {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },
}

/// Returns the schema version recorded in the store.
pub fn schema_version(conn: &Connection) -> Result<u32, SchemaError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(SchemaError::Version)
}

/// Creates or upgrades the schema, returning how many steps were applied.
///
/// # Errors
///
/// Returns `SchemaError::Step` if a step fails (that step is rolled back and
/// the recorded version stays at the last good one), and
/// `SchemaError::TooNew` if the store was written by a newer build.
pub fn bootstrap_schema(conn: &Connection) -> Result<usize, SchemaError> {
    apply_steps(conn, STEPS)
}

fn apply_steps(conn: &Connection, steps: &[&str]) -> Result<usize, SchemaError> {
    let current = schema_version(conn)?;
    let target = steps.len() as u32;
    if current > target {
        return Err(SchemaError::TooNew { found: current });
    }

    for (version, sql) in (current + 1..).zip(&steps[current as usize..]) {
        tracing::info!(version, "applying schema step");

        let step_failed = |source| SchemaError::Step { version, source };
        let tx = conn.unchecked_transaction().map_err(step_failed)?;
        tx.execute_batch(sql).map_err(step_failed)?;
        tx.pragma_update(None, "user_version", version)
            .map_err(step_failed)?;
        tx.commit().map_err(step_failed)?;
    }

    Ok((target - current) as usize)
}
