use std::future::Future;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::config::settings::{MetricsConfig, ServerConfig};
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::server::{pages, tokens};
use crate::store::TokenStore;
use crate::templates::TemplateHolder;

#[derive(Clone)]
pub struct AppState {
    pub store: TokenStore,
    pub templates: TemplateHolder,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub async fn new(store: TokenStore, templates: TemplateHolder) -> Self {
        let metrics = get_metrics().await;
        Self {
            store,
            templates,
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

pub fn router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    Router::new()
        .merge(tokens::router())
        .merge(pages::router())
        .merge(MetricsState::router(metrics_config))
        .with_state(state)
}

/// Serves the HTTP surface until `shutdown` resolves.
pub async fn start<F>(
    server_config: &ServerConfig,
    metrics_config: &MetricsConfig,
    state: AppState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics = get_metrics().await;
    let app = router(state, metrics_config);

    let bind_addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")?;
    metrics.up.set(0);
    Ok(())
}
