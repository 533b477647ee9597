//! JSON documents stored in text columns.
//!
//! `formularios_completados.datos_formulario` holds a [`DatosFormulario`] and
//! `formularios_sub.datos_subformulario` holds a [`DatosSubformulario`].
//! Both are encoded with `serde_json` on insert and decoded on read; every
//! field falls back to its empty default when a stored document omits it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::StoreError;

/// Free-form field map submitted by the client (question id → answer).
pub type Campos = Map<String, Value>;

/// Header block of a principal form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Encabezado {
    pub obra: String,
    pub nucleo: String,
    /// Date typed by the user; the filtered lookup matches on this value.
    pub fecha: String,
    pub hora: String,
}

/// Document stored for every principal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatosFormulario {
    /// Kept as submitted, fractions included.
    pub total_correctos: Number,
    pub total_incorrectos: Number,
    pub observaciones: String,
    pub campos: Campos,
    pub encabezado: Encabezado,
}

impl Default for DatosFormulario {
    fn default() -> Self {
        Self {
            total_correctos: Number::from(0),
            total_incorrectos: Number::from(0),
            observaciones: String::new(),
            campos: Campos::new(),
            encabezado: Encabezado::default(),
        }
    }
}

/// Document stored for every sub-form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatosSubformulario {
    pub campos: Campos,
    #[serde(rename = "headerData")]
    pub header_data: Map<String, Value>,
    /// Copied from the principal form at save time.
    pub observaciones: String,
}

impl DatosFormulario {
    /// Encodes the document for a text column.
    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a document read from a text column.
    pub fn decode(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl DatosSubformulario {
    /// Encodes the document for a text column.
    pub fn encode(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a document read from a text column.
    pub fn decode(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn principal_document_uses_stored_field_names() {
        let mut campos = Campos::new();
        campos.insert("p1".to_string(), json!("si"));
        let datos = DatosFormulario {
            total_correctos: Number::from(3),
            total_incorrectos: Number::from(1),
            observaciones: "sin novedad".to_string(),
            campos,
            encabezado: Encabezado {
                obra: "Obra 7".to_string(),
                nucleo: "Norte".to_string(),
                fecha: "2024-05-02".to_string(),
                hora: "08:30".to_string(),
            },
        };

        let value: Value = serde_json::from_str(&datos.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "total_correctos": 3,
                "total_incorrectos": 1,
                "observaciones": "sin novedad",
                "campos": {"p1": "si"},
                "encabezado": {
                    "obra": "Obra 7",
                    "nucleo": "Norte",
                    "fecha": "2024-05-02",
                    "hora": "08:30"
                }
            })
        );
    }

    #[test]
    fn sparse_documents_decode_with_defaults() {
        let datos = DatosFormulario::decode(r#"{"encabezado":{"fecha":"2024-05-02"}}"#).unwrap();
        assert_eq!(datos.encabezado.fecha, "2024-05-02");
        assert_eq!(datos.total_correctos, Number::from(0));
        assert!(datos.campos.is_empty());

        let sub = DatosSubformulario::decode("{}").unwrap();
        assert_eq!(sub, DatosSubformulario::default());
    }

    #[test]
    fn subform_header_keeps_client_key() {
        let mut header_data = Map::new();
        header_data.insert("obra".to_string(), json!("Obra 7"));
        let sub = DatosSubformulario {
            header_data,
            ..Default::default()
        };

        let value: Value = serde_json::from_str(&sub.encode().unwrap()).unwrap();
        assert_eq!(value["headerData"]["obra"], "Obra 7");
    }

    #[test]
    fn fractional_totals_survive_a_round_trip() {
        let datos = DatosFormulario::decode(r#"{"total_correctos":2.5}"#).unwrap();
        assert_eq!(datos.total_correctos.as_f64(), Some(2.5));

        let value: Value = serde_json::from_str(&datos.encode().unwrap()).unwrap();
        assert_eq!(value["total_correctos"], json!(2.5));
        assert_eq!(value["total_incorrectos"], json!(0));
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = DatosSubformulario::decode("not json").unwrap_err();
        assert!(matches!(err, StoreError::Document(_)));
    }
}
