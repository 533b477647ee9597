//! HTTP handlers for the formularios backend.
//!
//! Every route is public and stateless: a handler checks a connection out of
//! the pool held in [`AppState`], runs one or two queries through
//! `formularios-store` on the blocking thread pool, and reshapes the result
//! into JSON.

pub mod api;
pub mod api_formularios;
pub mod api_usuarios;
pub mod config;
pub mod payload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use formularios_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Liveness check; does not touch the database.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/test-db", get(api::test_db_handler))
        .route("/api/getEmpresas", get(api::get_empresas_handler))
        .route(
            "/api/getFormulariosFiltrados",
            get(api_formularios::get_formularios_filtrados_handler),
        )
        .route(
            "/api/getFormularioCompleto/{id}",
            get(api_formularios::get_formulario_completo_handler),
        )
        .route("/api/saveForm", post(api_formularios::save_form_handler))
        .route(
            "/api/registrarUsuario",
            post(api_usuarios::registrar_usuario_handler),
        )
        .route("/api/login", post(api_usuarios::login_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
