// src/main.rs
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod ai;
mod api;
mod browser;
mod config;
mod discovery;
mod extract;
mod history;
mod models;
mod normalize;
mod server;

use ai::AiClient;
use browser::{BrowserSessionManager, LaunchConfig};
use config::{load_config, Config};
use discovery::driver::BrowserPageDriver;
use discovery::DiscoveryEngine;
use history::HistoryStore;
use models::Result;
use server::{build_rocket, ServerState};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    std::env::set_var(
        "RUST_LOG",
        "contact_scout=info,hyper=warn,chromiumoxide=warn",
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("contact_scout=info".parse().unwrap()),
        )
        .init();

    let browser = Arc::new(BrowserSessionManager::new());
    let assistant = Arc::new(AiClient::from_env(&config.ai)?);
    let driver = Arc::new(BrowserPageDriver::new(
        Arc::clone(&browser),
        LaunchConfig::from(&config.browser),
        config.search.user_agent.clone(),
        config.navigation_timeout(),
        config.hint_navigation_timeout(),
    ));
    let engine = Arc::new(DiscoveryEngine::new(
        config.clone(),
        Arc::clone(&browser),
        driver,
        assistant,
    ));
    let history = Arc::new(HistoryStore::new(
        config.history.path.clone(),
        config.history.max_entries,
    ));

    let state = ServerState {
        config,
        engine,
        history,
    };

    info!("Starting API server...");
    tokio::select! {
        result = build_rocket(state).launch() => {
            let _ = result?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    browser.close().await;
    Ok(())
}
