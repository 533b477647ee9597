//! Principal forms and their sub-forms.
//!
//! A principal form lives in `formularios_completados`; its sub-forms live in
//! `formularios_sub` keyed by `formulario_principal_id`. Reads group sub-forms
//! into a map keyed by `tipo_formulario_id`, so when a principal has two
//! sub-forms of the same type the later row replaces the earlier one.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::documents::{DatosFormulario, DatosSubformulario};
use crate::error::StoreError;

/// Sub-form documents keyed by `tipo_formulario_id`.
pub type Subformularios = BTreeMap<i64, DatosSubformulario>;

/// Parameters for inserting a principal form.
#[derive(Debug, Clone)]
pub struct NewFormulario {
    pub empresa_id: i64,
    pub usuario_id: i64,
    pub tipo_formulario_id: i64,
    /// `YYYY-MM-DD HH:MM:SS` in UTC, or `None` when the client sent no date.
    pub fecha_completado: Option<String>,
    pub datos: DatosFormulario,
}

/// A principal form as returned by the full-form lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormularioPrincipal {
    pub id: i64,
    pub empresa_id: i64,
    pub usuario_id: i64,
    pub tipo_formulario_id: i64,
    pub fecha_completado: Option<String>,
    pub datos_formulario: DatosFormulario,
}

/// A principal form as returned by the filtered lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormularioResumen {
    pub id: i64,
    pub empresa_id: i64,
    pub nombre_empresa: Option<String>,
    pub fecha_completado: Option<String>,
    pub datos_formulario: DatosFormulario,
}

/// One entry of the filtered lookup: a principal plus its sub-forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormularioConSubformularios {
    #[serde(rename = "formularioPrincipal")]
    pub formulario_principal: FormularioResumen,
    pub subformularios: Subformularios,
}

/// Inserts a principal form, flagged as mandatory, and returns its id.
pub fn insert_formulario(conn: &Connection, formulario: &NewFormulario) -> Result<i64, StoreError> {
    let datos = formulario.datos.encode()?;
    conn.execute(
        "INSERT INTO formularios_completados (
            empresa_id, usuario_id, tipo_formulario_id,
            fecha_completado, datos_formulario, es_obligatorio
        ) VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![
            formulario.empresa_id,
            formulario.usuario_id,
            formulario.tipo_formulario_id,
            formulario.fecha_completado,
            datos,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts one sub-form attached to `formulario_principal_id` and returns its id.
pub fn insert_subformulario(
    conn: &Connection,
    formulario_principal_id: i64,
    tipo_formulario_id: i64,
    datos: &DatosSubformulario,
) -> Result<i64, StoreError> {
    let datos = datos.encode()?;
    conn.execute(
        "INSERT INTO formularios_sub (
            formulario_principal_id, tipo_formulario_id, datos_subformulario
        ) VALUES (?1, ?2, ?3)",
        params![formulario_principal_id, tipo_formulario_id, datos],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetches a principal form by id.
pub fn get_formulario(conn: &Connection, id: i64) -> Result<Option<FormularioPrincipal>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, empresa_id, usuario_id, tipo_formulario_id, fecha_completado, datos_formulario
             FROM formularios_completados WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, empresa_id, usuario_id, tipo_formulario_id, fecha_completado, datos)) = row else {
        return Ok(None);
    };

    Ok(Some(FormularioPrincipal {
        id,
        empresa_id,
        usuario_id,
        tipo_formulario_id,
        fecha_completado,
        datos_formulario: DatosFormulario::decode(&datos)?,
    }))
}

/// Fetches every sub-form of a principal, keyed by type id.
pub fn list_subformularios(
    conn: &Connection,
    formulario_principal_id: i64,
) -> Result<Subformularios, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT tipo_formulario_id, datos_subformulario
         FROM formularios_sub WHERE formulario_principal_id = ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([formulario_principal_id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut subformularios = Subformularios::new();
    for row in rows {
        let (tipo, datos) = row?;
        subformularios.insert(tipo, DatosSubformulario::decode(&datos)?);
    }
    Ok(subformularios)
}

/// One row of the principal ⟕ sub-form ⟕ company join.
#[derive(Debug, Clone)]
pub(crate) struct JoinedRow {
    pub id: i64,
    pub empresa_id: i64,
    pub fecha_completado: Option<String>,
    pub datos_formulario: String,
    pub tipo_formulario_id: Option<i64>,
    pub datos_subformulario: Option<String>,
    pub nombre_empresa: Option<String>,
}

/// Finds the principal forms of a company whose header date equals `fecha`,
/// each with its sub-forms. Principals without sub-forms are included.
///
/// Results are ordered by principal id.
pub fn find_filtrados(
    conn: &Connection,
    empresa_id: i64,
    fecha: &str,
) -> Result<Vec<FormularioConSubformularios>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT fc.id, fc.empresa_id, fc.fecha_completado, fc.datos_formulario,
                fs.tipo_formulario_id, fs.datos_subformulario, e.nombre_empresa
         FROM formularios_completados AS fc
         LEFT JOIN formularios_sub AS fs ON fc.id = fs.formulario_principal_id
         LEFT JOIN empresas AS e ON fc.empresa_id = e.id
         WHERE fc.empresa_id = ?1
           AND json_extract(fc.datos_formulario, '$.encabezado.fecha') = ?2
         ORDER BY fc.id ASC, fs.id ASC",
    )?;
    let rows = stmt.query_map(params![empresa_id, fecha], |row| {
        Ok(JoinedRow {
            id: row.get(0)?,
            empresa_id: row.get(1)?,
            fecha_completado: row.get(2)?,
            datos_formulario: row.get(3)?,
            tipo_formulario_id: row.get(4)?,
            datos_subformulario: row.get(5)?,
            nombre_empresa: row.get(6)?,
        })
    })?;

    let mut joined = Vec::new();
    for row in rows {
        joined.push(row?);
    }
    group_rows(joined)
}

/// Folds joined rows into one entry per principal id.
pub(crate) fn group_rows(
    joined: Vec<JoinedRow>,
) -> Result<Vec<FormularioConSubformularios>, StoreError> {
    let mut grouped: BTreeMap<i64, FormularioConSubformularios> = BTreeMap::new();

    for row in joined {
        let entry = match grouped.entry(row.id) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                vacant.insert(FormularioConSubformularios {
                    formulario_principal: FormularioResumen {
                        id: row.id,
                        empresa_id: row.empresa_id,
                        nombre_empresa: row.nombre_empresa,
                        fecha_completado: row.fecha_completado,
                        datos_formulario: DatosFormulario::decode(&row.datos_formulario)?,
                    },
                    subformularios: Subformularios::new(),
                })
            }
        };

        // A zero type id is treated like a missing sub-form.
        if let (Some(tipo), Some(datos)) = (row.tipo_formulario_id, row.datos_subformulario) {
            if tipo != 0 {
                entry
                    .subformularios
                    .insert(tipo, DatosSubformulario::decode(&datos)?);
            }
        }
    }

    Ok(grouped.into_values().collect())
}
