//! Company lookups.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A company that forms are filed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empresa {
    pub id: i64,
    pub nombre_empresa: String,
}

/// Lists every company in the store's natural order.
pub fn list_empresas(conn: &Connection) -> Result<Vec<Empresa>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, nombre_empresa FROM empresas")?;
    let rows = stmt.query_map([], |row| {
        Ok(Empresa {
            id: row.get(0)?,
            nombre_empresa: row.get(1)?,
        })
    })?;

    let mut empresas = Vec::new();
    for row in rows {
        empresas.push(row?);
    }
    Ok(empresas)
}

/// Resolves a company name to its id. The match is exact.
///
/// When several companies share the name, the first row returned wins.
pub fn find_empresa_id(conn: &Connection, nombre_empresa: &str) -> Result<Option<i64>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM empresas WHERE nombre_empresa = ?1",
            [nombre_empresa],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}
