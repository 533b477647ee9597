//! Request body of `POST /api/saveForm` and its translation into rows.
//!
//! Clients send loosely typed JSON: ids may arrive as numbers or numeric
//! strings, counters may be missing, whole sections may be absent or arrive
//! as something other than an object (an empty `[]` for "no answers" is
//! common). Nothing in the body is rejected for its shape; falsy, missing or
//! mistyped values take the defaults below and anything else is coerced.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use formularios_store::{Campos, DatosFormulario, DatosSubformulario, Encabezado, NewFormulario};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Used for `empresa_id`, `usuario_id` and `tipo_formulario_id` when the
/// header does not carry a usable value.
const DEFAULT_ID: i64 = 1;

/// Store format for `fecha_completado`.
const FECHA_COMPLETADO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while interpreting a save request.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("fechaEnvio is not a recognizable timestamp: {0}")]
    InvalidFechaEnvio(String),
}

/// One section of the submitted form (principal or sub-form).
///
/// Blocks that are not JSON objects read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seccion {
    #[serde(rename = "headerData")]
    pub header_data: Option<Value>,
    #[serde(rename = "formData")]
    pub form_data: Option<Value>,
    pub totals: Option<Value>,
}

impl Seccion {
    fn from_value(value: Option<Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// Body of `POST /api/saveForm`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SaveFormRequest {
    #[serde(rename = "controlOperacional")]
    pub control_operacional: Option<Value>,
    pub botiquin: Option<Value>,
    pub acidente: Option<Value>,
    #[serde(rename = "fechaEnvio")]
    pub fecha_envio: Option<Value>,
}

/// A sub-form ready to be inserted once the principal id is known.
#[derive(Debug, Clone)]
pub struct PendingSubform {
    pub tipo_formulario_id: i64,
    /// Human-readable slot name, used in logs.
    pub nombre: &'static str,
    pub datos: DatosSubformulario,
}

/// Everything a save request writes: one principal and its sub-forms.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub formulario: NewFormulario,
    pub subformularios: Vec<PendingSubform>,
}

impl SaveFormRequest {
    /// Builds the principal row and the list of non-empty sub-forms.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::InvalidFechaEnvio` if `fechaEnvio` is present
    /// but cannot be read as a timestamp.
    pub fn into_plan(self) -> Result<SavePlan, PayloadError> {
        let fecha_completado = normalize_fecha_envio(self.fecha_envio.as_ref())?;

        let principal = Seccion::from_value(self.control_operacional);
        let header = object(principal.header_data);
        let totals = object(principal.totals);
        let observaciones = text_field(&header, "observaciones");

        let formulario = NewFormulario {
            empresa_id: id_field(&header, "empresa_id"),
            usuario_id: id_field(&header, "usuario_id"),
            tipo_formulario_id: id_field(&header, "tipo_formulario_id"),
            fecha_completado,
            datos: DatosFormulario {
                total_correctos: total_field(&totals, "totalCorrectos"),
                total_incorrectos: total_field(&totals, "totalIncorrectos"),
                observaciones: observaciones.clone(),
                campos: object(principal.form_data),
                encabezado: Encabezado {
                    obra: text_field(&header, "obra"),
                    nucleo: text_field(&header, "nucleo"),
                    fecha: text_field(&header, "fecha"),
                    hora: text_field(&header, "hora"),
                },
            },
        };

        // Insertion order of the sub-form slots.
        let slots = [
            (2, "Botiquín", self.botiquin),
            (3, "Accidente", self.acidente),
        ];

        let subformularios = slots
            .into_iter()
            .filter_map(|(tipo_formulario_id, nombre, seccion)| {
                let seccion = Seccion::from_value(seccion);
                let campos = object(seccion.form_data);
                if campos.is_empty() {
                    return None;
                }
                Some(PendingSubform {
                    tipo_formulario_id,
                    nombre,
                    datos: DatosSubformulario {
                        campos,
                        header_data: object(seccion.header_data),
                        observaciones: observaciones.clone(),
                    },
                })
            })
            .collect();

        Ok(SavePlan {
            formulario,
            subformularios,
        })
    }
}

/// Reads a block as a field map; anything but an object is empty.
fn object(value: Option<Value>) -> Campos {
    match value {
        Some(Value::Object(map)) => map,
        _ => Campos::new(),
    }
}

/// Reads a non-zero integer id, accepting numeric strings.
fn id_field(map: &Map<String, Value>, key: &str) -> i64 {
    map.get(key)
        .and_then(as_integer)
        .filter(|id| *id != 0)
        .unwrap_or(DEFAULT_ID)
}

/// Reads a total as submitted (fractions kept), defaulting to zero.
fn total_field(map: &Map<String, Value>, key: &str) -> Number {
    let parsed = match map.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    };
    parsed.unwrap_or_else(|| Number::from(0))
}

/// Reads a text field; numbers are rendered, falsy values become "".
fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts `fechaEnvio` to the store's `YYYY-MM-DD HH:MM:SS` UTC format.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`
/// (read as UTC), plain dates, and epoch milliseconds. Missing, null, empty,
/// `false` and `0` mean "no date".
pub fn normalize_fecha_envio(value: Option<&Value>) -> Result<Option<String>, PayloadError> {
    let instant = match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => parse_timestamp(s.trim()),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        Some(_) => None,
    };

    instant
        .map(|dt| Some(dt.format(FECHA_COMPLETADO_FORMAT).to_string()))
        .ok_or_else(|| PayloadError::InvalidFechaEnvio(value.map(Value::to_string).unwrap_or_default()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
