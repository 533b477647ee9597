//! Database layer for the formularios backend.
//!
//! Provides SQLite connection pooling (via `r2d2`), the startup reachability
//! check, and the embedded schema bootstrap that creates the `empresas`,
//! `usuarios`, `formularios_completados` and `formularios_sub` tables.
//!
//! The pool is built lazily: constructing it never touches the database, so
//! an unreachable store does not stop the process from starting. Callers use
//! [`check_connectivity`] to find out whether the store answers, and every
//! later query fails on its own if it does not.

mod pool;
mod schema;

pub use pool::{check_connectivity, create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use schema::{bootstrap_schema, schema_version, SchemaError, SCHEMA_VERSION};
