use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use configs::{AppConfig, StorageEngine};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::{runtime, storage};

use crate::errors::StartupError;
use crate::routes::{self, ApiState};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: select the storage backend, build the app, serve.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    // configuration failures are fatal before the listener binds
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    if cfg.storage.engine == StorageEngine::File {
        if let Some(parent) = std::path::Path::new(&cfg.storage.file_path).parent() {
            runtime::ensure_env(&parent.to_string_lossy()).await?;
        }
    }

    // the backend is chosen exactly once; handlers only ever see the facade
    let storage = storage::from_config(&cfg).await?;
    let state = ApiState { storage: Arc::clone(&storage) };

    let app: Router = routes::build_router(build_cors(), state);

    let addr = bind_addr(&cfg)?;
    info!(%addr, engine = ?cfg.storage.engine, "starting api server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
