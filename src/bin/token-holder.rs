use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use token_holder::config::loader::file_to_config;
use token_holder::server::server::{self, AppState};
use token_holder::store::TokenStore;
use token_holder::templates::TemplateHolder;
use token_holder::utils::logging::{self, LogLevel};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-holder.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = file_to_config(Path::new(&args.config))?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Start token store
    // -------------------------------

    let store = TokenStore::new();
    store
        .start(service_config.store.to_settings())
        .await
        .context("failed to start token store")?;

    // -------------------------------
    // 3. Load templates
    // -------------------------------

    let templates = TemplateHolder::new();
    if let Some(templates_config) = &service_config.templates {
        templates
            .load_templates(&templates_config.dir)
            .await
            .with_context(|| format!("failed to load templates from {}", templates_config.dir.display()))?;
    }

    // -------------------------------
    // 4. Serve until ctrl-c
    // -------------------------------

    let state = AppState::new(store.clone(), templates).await;
    info!("Service starting...");
    let served = server::start(
        &service_config.server,
        &service_config.metrics,
        state,
        shutdown_signal(),
    )
    .await;

    store.stop().await;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
