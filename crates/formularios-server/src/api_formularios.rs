//! Form lookup and submission handlers.

use crate::api::{with_conn, ApiError, MessageResponse};
use crate::payload::SaveFormRequest;
use crate::AppState;
use axum::extract::{Extension, Json, Path, Query};
use formularios_store::{
    find_empresa_id, find_filtrados, get_formulario, insert_formulario, insert_subformulario,
    list_subformularios, FormularioConSubformularios, FormularioPrincipal, Subformularios,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const EMPRESA_NOT_FOUND: &str = "Empresa no encontrada";
const FORMULARIO_NOT_FOUND: &str = "Formulario principal no encontrado";

#[derive(Debug, Deserialize)]
pub struct FiltroParams {
    pub nombre_empresa: Option<String>,
    pub fecha: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FormulariosFiltradosResponse {
    pub formularios: Vec<FormularioConSubformularios>,
}

#[derive(Debug, Serialize)]
pub struct FormularioCompletoResponse {
    #[serde(rename = "formularioPrincipal")]
    pub formulario_principal: FormularioPrincipal,
    pub subformularios: Subformularios,
}

/// GET /api/getFormulariosFiltrados?nombre_empresa=&fecha=
///
/// An unknown company is a 404; a known company with no matching forms is an
/// empty list.
pub async fn get_formularios_filtrados_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<FiltroParams>,
) -> Result<Json<FormulariosFiltradosResponse>, ApiError> {
    let Some(nombre_empresa) = params.nombre_empresa else {
        return Err(ApiError::NotFound(EMPRESA_NOT_FOUND.to_string()));
    };

    let empresa_id = with_conn(&state.pool, move |conn| find_empresa_id(conn, &nombre_empresa))
        .await
        .map_err(ApiError::internal("Error al obtener el ID de la empresa"))?
        .ok_or_else(|| ApiError::NotFound(EMPRESA_NOT_FOUND.to_string()))?;

    let Some(fecha) = params.fecha else {
        return Ok(Json(FormulariosFiltradosResponse {
            formularios: Vec::new(),
        }));
    };

    let formularios = with_conn(&state.pool, move |conn| {
        find_filtrados(conn, empresa_id, &fecha)
    })
    .await
    .map_err(ApiError::internal("Error al obtener los formularios"))?;

    tracing::debug!(empresa_id, count = formularios.len(), "filtered forms lookup");

    Ok(Json(FormulariosFiltradosResponse { formularios }))
}

/// GET /api/getFormularioCompleto/{id}
pub async fn get_formulario_completo_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FormularioCompletoResponse>, ApiError> {
    // A non-numeric id cannot name a row.
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| ApiError::NotFound(FORMULARIO_NOT_FOUND.to_string()))?;

    let formulario_principal = with_conn(&state.pool, move |conn| get_formulario(conn, id))
        .await
        .map_err(ApiError::internal("Error al obtener el formulario principal"))?
        .ok_or_else(|| ApiError::NotFound(FORMULARIO_NOT_FOUND.to_string()))?;

    let subformularios = with_conn(&state.pool, move |conn| list_subformularios(conn, id))
        .await
        .map_err(ApiError::internal("Error al obtener los subformularios"))?;

    Ok(Json(FormularioCompletoResponse {
        formulario_principal,
        subformularios,
    }))
}

/// POST /api/saveForm
///
/// Inserts the principal form, then all non-empty sub-forms concurrently.
/// Nothing is rolled back: if a sub-form fails the principal and any sibling
/// that succeeded stay in the store, and the client gets a 500.
pub async fn save_form_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SaveFormRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    tracing::debug!(?payload, "received form submission");

    let plan = payload.into_plan().map_err(|e| {
        tracing::warn!(error = %e, "rejected form submission");
        ApiError::BadRequest("Fecha de envío inválida".to_string())
    })?;

    tracing::debug!(datos = ?plan.formulario.datos, "prepared principal document");

    let formulario = plan.formulario;
    let principal_id = with_conn(&state.pool, move |conn| insert_formulario(conn, &formulario))
        .await
        .map_err(ApiError::internal("Error al guardar el formulario principal"))?;

    tracing::info!(principal_id, "saved principal form");

    let inserts = plan.subformularios.into_iter().map(|sub| {
        let pool = state.pool.clone();
        async move {
            tracing::debug!(subform = sub.nombre, datos = ?sub.datos, "saving sub-form");
            let nombre = sub.nombre;
            with_conn(&pool, move |conn| {
                insert_subformulario(conn, principal_id, sub.tipo_formulario_id, &sub.datos)
            })
            .await
            .map_err(|e| (nombre, e))
        }
    });

    let mut failed = false;
    for result in join_all(inserts).await {
        if let Err((nombre, e)) = result {
            tracing::error!(subform = nombre, principal_id, error = %e, "failed to save sub-form");
            failed = true;
        }
    }
    if failed {
        return Err(ApiError::InternalServerError(
            "Error al guardar los subformularios".to_string(),
        ));
    }

    tracing::info!(principal_id, "saved principal form and sub-forms");

    Ok(Json(MessageResponse {
        message: "Formulario principal y subformularios guardados con éxito".to_string(),
    }))
}
