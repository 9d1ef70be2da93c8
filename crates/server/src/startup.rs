use std::{future::Future, net::SocketAddr};

use axum::Router;
use common::{env::ensure_data_dir, utils::logging::init_logging_from_env};
use configs::AppConfig;
use dotenvy::dotenv;
use service::FileCounterStore;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::metrics;
use crate::routes::{self, AppState};

/// Load config from `config.toml` and env vars
fn load_config() -> Result<AppConfig, StartupError> {
    AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

fn parse_bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = cfg.bind_addr();
    raw.parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {raw}: {e}")))
}

/// Prepare the counter record and the handler state.
///
/// The record is created (count 0) if absent; the call fails if an existing
/// record cannot be read or parsed, so nothing is served from a bad store.
pub async fn build_state(cfg: &AppConfig) -> Result<AppState, StartupError> {
    ensure_data_dir(&cfg.storage.path).await?;
    let store = FileCounterStore::open(&cfg.storage.path, cfg.storage.io_timeout()).await?;
    Ok(AppState::new(store))
}

pub fn build_app(state: AppState) -> Router {
    routes::build_router(state, routes::build_cors())
}

/// Serve `app` on `listener` until `shutdown` resolves; in-flight requests finish first.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = load_config()?;
    let state = build_state(&cfg).await?;
    if let Ok(count) = state.store.read().await {
        metrics::observe_count(count);
    }

    let app = build_app(state);
    let addr = parse_bind_addr(&cfg)?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, record = %cfg.storage.path.display(), "visitor counter listening");
    serve(listener, app, shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_from_config() -> anyhow::Result<()> {
        let mut cfg = AppConfig::default();
        cfg.server.host = "127.0.0.1".into();
        cfg.server.port = 3001;
        assert_eq!(parse_bind_addr(&cfg)?, "127.0.0.1:3001".parse::<SocketAddr>()?);

        cfg.server.host = "not a host".into();
        assert!(matches!(parse_bind_addr(&cfg), Err(StartupError::InvalidConfig(_))));
        Ok(())
    }
}
