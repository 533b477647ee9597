//! Shared handler plumbing plus the `/test-db` check and company listing.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use formularios_db::DbPool;
use formularios_store::{list_empresas, Empresa, StoreError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
///
/// The message is sent to the client verbatim as `{"error": message}`, so it
/// must never carry database error text.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    /// Returns a mapper that logs a failed store call and replaces it with a
    /// 500 carrying only `message`.
    pub fn internal(message: &'static str) -> impl FnOnce(BlockingError) -> ApiError {
        move |e| {
            tracing::error!(error = %e, "{}", message);
            ApiError::InternalServerError(message.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Failure of a store call run on the blocking pool.
#[derive(Debug, Error)]
pub enum BlockingError {
    #[error("db connection failed: {0}")]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs `f` with a pooled connection on the blocking thread pool.
///
/// Each call checks out its own connection, so concurrent calls use separate
/// connections up to the pool's size.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, BlockingError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<T, BlockingError> {
        let conn = pool.get()?;
        Ok(f(&*conn)?)
    })
    .await?
}

/// Response body carrying only a confirmation message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response body for company listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmpresasResponse {
    pub empresas: Vec<Empresa>,
}

/// Handler for `GET /test-db`.
///
/// Answers in plain text, not JSON.
pub async fn test_db_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<String, (StatusCode, &'static str)> {
    let solution: i64 = with_conn(&state.pool, |conn| {
        Ok(conn.query_row("SELECT 1 + 1 AS solution", [], |row| row.get(0))?)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "test-db query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Error en la consulta")
    })?;

    Ok(format!("La solución es: {}", solution))
}

/// Handler for `GET /api/getEmpresas`.
pub async fn get_empresas_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<EmpresasResponse>, ApiError> {
    let empresas = with_conn(&state.pool, list_empresas)
        .await
        .map_err(ApiError::internal("Error al obtener empresas"))?;

    Ok(Json(EmpresasResponse { empresas }))
}
