#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use formularios_db::{bootstrap_schema, create_pool, DbPool, DbRuntimeSettings};
use formularios_server::{app, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router plus direct pool access for seeding and assertions.
///
/// The database lives in a temporary directory that is removed on drop.
pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    _dir: TempDir,
}

/// Builds an app over a fresh schema seeded with company 1
/// ("Constructora Sur") and user 1 ("operario").
pub fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("formularios.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default());
    {
        let conn = pool.get().unwrap();
        bootstrap_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO empresas (nombre_empresa) VALUES ('Constructora Sur')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO usuarios (nombre_usuario, password) VALUES ('operario', 'clave')",
            [],
        )
        .unwrap();
    }

    TestApp {
        app: app(AppState { pool: pool.clone() }),
        pool,
        _dir: dir,
    }
}

impl TestApp {
    /// Sends a GET and returns the status and the parsed JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Sends a JSON POST and returns the status and the parsed JSON body.
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub fn count(&self, table: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }
}
