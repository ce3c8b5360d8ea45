use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token store metrics
    pub tokens_issued: IntCounter,
    pub digest_collisions: IntCounter,
    pub entropy_fallbacks: IntCounter,
    pub checkouts: IntCounterVec,
    pub tokens_dropped: IntCounter,
    pub tokens_swept: IntCounter,
    pub registry_size: IntGauge,
    pub reaper_running: IntGauge,

    // Template metrics
    pub template_loads: IntCounterVec,
    pub template_render_failures: IntCounterVec,

    // Runtime
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenholder".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token store
            tokens_issued: IntCounter::new("tokens_issued_total", "Tokens handed out by the store").expect("metric"),
            digest_collisions: IntCounter::new("token_digest_collisions_total", "Generated tokens discarded because their digest was already registered").expect("metric"),
            entropy_fallbacks: IntCounter::new("entropy_fallbacks_total", "Tokens generated from the fallback random source").expect("metric"),
            checkouts: IntCounterVec::new(Opts::new("token_checkouts_total", "Checkouts by outcome"), &["outcome"]).expect("metric"),
            tokens_dropped: IntCounter::new("tokens_dropped_total", "Tokens invalidated by callers").expect("metric"),
            tokens_swept: IntCounter::new("tokens_swept_total", "Expired records removed by the reaper").expect("metric"),
            registry_size: IntGauge::new("registry_records", "Records currently held by the registry").expect("metric"),
            reaper_running: IntGauge::new("reaper_running", "1 while a reaper task is active").expect("metric"),

            // Templates
            template_loads: IntCounterVec::new(Opts::new("template_loads_total", "Template directory loads by result"), &["result"]).expect("metric"),
            template_render_failures: IntCounterVec::new(Opts::new("template_render_failures_total", "Template renders that failed"), &["reason"]).expect("metric"),

            up: IntGauge::new("up", "1 if service is healthy").expect("metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.tokens_issued.clone())).expect("register metric");
        reg.register(Box::new(metrics.digest_collisions.clone())).expect("register metric");
        reg.register(Box::new(metrics.entropy_fallbacks.clone())).expect("register metric");
        reg.register(Box::new(metrics.checkouts.clone())).expect("register metric");
        reg.register(Box::new(metrics.tokens_dropped.clone())).expect("register metric");
        reg.register(Box::new(metrics.tokens_swept.clone())).expect("register metric");
        reg.register(Box::new(metrics.registry_size.clone())).expect("register metric");
        reg.register(Box::new(metrics.reaper_running.clone())).expect("register metric");
        reg.register(Box::new(metrics.template_loads.clone())).expect("register metric");
        reg.register(Box::new(metrics.template_render_failures.clone())).expect("register metric");
        reg.register(Box::new(metrics.up.clone())).expect("register metric");

        metrics
    }
}
