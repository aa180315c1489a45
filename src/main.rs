mod analysis;
mod api;
mod config;
mod db;
mod error;
mod extract;
mod fetcher;
mod oracle;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::CheckStore;
use crate::error::{AppError, Result};
use crate::fetcher::DocumentFetcher;
use crate::oracle::FairnessOracle;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let store = CheckStore::open(&cfg.db_path).await?;

    let fetcher = DocumentFetcher::new().map_err(|e| AppError::Config(e.to_string()))?;

    // Decided once; handlers never re-check key presence.
    let oracle = Arc::new(FairnessOracle::from_config(&cfg));

    let state = ApiState {
        store,
        fetcher,
        oracle,
        currency: cfg.currency.clone(),
    };
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
