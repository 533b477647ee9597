//! Formularios server binary.
//!
//! Starts an axum HTTP server with structured logging, a lazily connected
//! database pool, and graceful shutdown on SIGTERM/SIGINT.

use formularios_server::{app, config, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FORMULARIOS_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let pool = formularios_db::create_pool(
        &config.database.path,
        config.database.runtime_settings(),
    );

    // An unreachable store is logged, not fatal: requests fail one by one.
    let check_pool = pool.clone();
    let startup = tokio::task::spawn_blocking(move || {
        formularios_db::check_connectivity(&check_pool)?;
        let conn = check_pool.get()?;
        let applied = formularios_db::bootstrap_schema(&conn)?;
        Ok::<_, StartupDbError>(applied)
    })
    .await;

    match startup {
        Ok(Ok(applied)) => {
            tracing::info!(path = %config.database.path, "database pool connected");
            if applied > 0 {
                tracing::info!(count = applied, "applied schema steps");
            }
        }
        Ok(Err(e)) => {
            tracing::error!(path = %config.database.path, error = %e, "database not ready, serving anyway");
        }
        Err(e) => {
            tracing::error!(error = %e, "database startup task panicked, serving anyway");
        }
    }

    let app = app(AppState { pool });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting formularios server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("formularios server shut down");
}

/// Startup database failures; only ever logged.
#[derive(Debug, thiserror::Error)]
enum StartupDbError {
    #[error(transparent)]
    Pool(#[from] formularios_db::PoolError),
    #[error("failed to acquire a database connection: {0}")]
    Acquire(#[from] r2d2::Error),
    #[error(transparent)]
    Schema(#[from] formularios_db::SchemaError),
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
