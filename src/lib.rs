mod body;
mod config;
mod dispatch;
mod errors;
mod models;
mod request_log;
mod store;

pub use crate::config::ServiceConfig;
pub use crate::dispatch::{AppState, Route};
pub use crate::errors::{AppError, AppResult, RequestLogError, StoreError};
pub use crate::models::Todo;
pub use crate::request_log::RequestLog;
pub use crate::store::TodoStore;

use anyhow::Context;
use axum::Router;
use std::sync::Arc;

pub fn app(state: AppState) -> Router {
    Router::new().fallback(dispatch::dispatch).with_state(state)
}

pub fn build_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let mut store = TodoStore::new(config.data_file.clone());
    if config.serialize_requests {
        store = store.with_request_lock();
    }
    let request_log = RequestLog::open(&config.log_file)
        .with_context(|| format!("opening request log {}", config.log_file.display()))?;

    Ok(AppState {
        store: Arc::new(store),
        request_log,
    })
}

pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    init_tracing(config.json_logs)?;

    let state = build_state(&config)?;
    if config.create_missing && state.store.ensure_exists().await? {
        tracing::info!(path = %state.store.path().display(), "created empty todo collection");
    }
    if config.serialize_requests {
        tracing::info!("request serialization enabled");
    }

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.host, config.port))?;
    tracing::info!("Server running at http://{}:{}/", config.host, config.port);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|error| anyhow::anyhow!(error.to_string()))
}
