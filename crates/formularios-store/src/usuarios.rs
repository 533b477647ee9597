//! User registration and credential checks.
//!
//! Passwords are stored and compared verbatim in SQL. A missing name or
//! password is bound as SQL `NULL`: registration then fails on the column's
//! `NOT NULL` constraint and a credential check never matches.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Role assigned when registration does not name one.
pub const DEFAULT_ROL: &str = "empleado";

/// A user as exposed to clients. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub nombre_usuario: String,
    pub rol: String,
}

/// Parameters for registering a user.
#[derive(Debug, Clone)]
pub struct NewUsuario<'a> {
    pub nombre_usuario: Option<&'a str>,
    pub password: Option<&'a str>,
    pub rol: &'a str,
}

/// Inserts a user and returns the new row id.
///
/// Nothing is checked beyond the table's own constraints; registering the
/// same name twice creates two rows.
pub fn register_usuario(conn: &Connection, usuario: &NewUsuario<'_>) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO usuarios (nombre_usuario, password, rol) VALUES (?1, ?2, ?3)",
        params![usuario.nombre_usuario, usuario.password, usuario.rol],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the first user whose name and password both match exactly.
pub fn find_by_credentials(
    conn: &Connection,
    nombre_usuario: Option<&str>,
    password: Option<&str>,
) -> Result<Option<Usuario>, StoreError> {
    let usuario = conn
        .query_row(
            "SELECT id, nombre_usuario, rol FROM usuarios
             WHERE nombre_usuario = ?1 AND password = ?2",
            params![nombre_usuario, password],
            |row| {
                Ok(Usuario {
                    id: row.get(0)?,
                    nombre_usuario: row.get(1)?,
                    rol: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(usuario)
}
