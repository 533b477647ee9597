//! User registration and login handlers.
//!
//! Credential fields are read leniently: strings are used as-is, numbers are
//! rendered as text, and anything else counts as missing. Missing values go
//! to the store as `NULL`, so a login without a password is a plain 401.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use formularios_store::{find_by_credentials, register_usuario, NewUsuario, Usuario, DEFAULT_ROL};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrarUsuarioRequest {
    pub nombre_usuario: Option<Value>,
    pub password: Option<Value>,
    /// Defaults to `empleado`.
    pub rol: Option<Value>,
}

/// Response body for successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrarUsuarioResponse {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub nombre_usuario: Option<Value>,
    pub password: Option<Value>,
}

fn credential(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Response body for successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: Usuario,
}

/// POST /api/registrarUsuario
pub async fn registrar_usuario_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegistrarUsuarioRequest>,
) -> Result<(StatusCode, Json<RegistrarUsuarioResponse>), ApiError> {
    let nombre_usuario = credential(payload.nombre_usuario.as_ref());
    let password = credential(payload.password.as_ref());
    let rol = credential(payload.rol.as_ref()).unwrap_or_else(|| DEFAULT_ROL.to_string());

    let user_id = with_conn(&state.pool, move |conn| {
        register_usuario(
            conn,
            &NewUsuario {
                nombre_usuario: nombre_usuario.as_deref(),
                password: password.as_deref(),
                rol: &rol,
            },
        )
    })
    .await
    .map_err(ApiError::internal("Error al registrar el usuario"))?;

    tracing::info!(user_id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegistrarUsuarioResponse {
            message: "Usuario registrado con éxito".to_string(),
            user_id,
        }),
    ))
}

/// POST /api/login
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let nombre_usuario = credential(payload.nombre_usuario.as_ref());
    let password = credential(payload.password.as_ref());

    let usuario = with_conn(&state.pool, move |conn| {
        find_by_credentials(conn, nombre_usuario.as_deref(), password.as_deref())
    })
    .await
    .map_err(ApiError::internal("Error en el proceso de login"))?
    .ok_or_else(|| ApiError::Unauthorized("Credenciales incorrectas".to_string()))?;

    tracing::info!(user_id = usuario.id, "user logged in");

    Ok(Json(LoginResponse {
        message: "Login exitoso".to_string(),
        user: usuario,
    }))
}
