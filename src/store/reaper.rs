use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::observability::metrics::get_metrics;
use crate::store::token_store::State;

/// Background sweeper of expired records.
///
/// Ticks every sweep interval; picks up interval changes from the watch
/// channel. On cancellation it wipes the whole registry once and exits.
pub(crate) struct Reaper {
    state: Arc<Mutex<State>>,
    sweep_rx: watch::Receiver<Duration>,
}

/// Owned by the store while a reaper is running.
pub(crate) struct ReaperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub(crate) fn spawn(runtime: &tokio::runtime::Handle, reaper: Reaper) -> Self {
        let cancel = CancellationToken::new();
        let task = runtime.spawn(reaper.run(cancel.clone()));
        Self { cancel, task }
    }

    /// Cancels the reaper and waits for its final clear.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!("reaper task ended abnormally: {}", err);
        }
    }

    /// Signals cancellation without waiting.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Reaper {
    pub(crate) fn new(state: Arc<Mutex<State>>, sweep_rx: watch::Receiver<Duration>) -> Self {
        Self { state, sweep_rx }
    }

    async fn run(self, cancel: CancellationToken) {
        let Reaper { state, mut sweep_rx } = self;
        let metrics = get_metrics().await;
        let mut period = *sweep_rx.borrow_and_update();
        let mut ticker = sweep_ticker(period);
        metrics.reaper_running.set(1);
        info!("reaper started, sweep interval {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = sweep_rx.changed() => {
                    if changed.is_err() {
                        debug!("sweep interval channel closed");
                        break;
                    }
                    period = *sweep_rx.borrow_and_update();
                    ticker = sweep_ticker(period);
                    info!("sweep interval changed to {:?}", period);
                }
                _ = ticker.tick() => sweep(&state).await,
            }
        }

        let cleared = state.lock().await.registry.clear();
        metrics.registry_size.set(0);
        metrics.reaper_running.set(0);
        info!("reaper stopped, {} records cleared", cleared);
    }
}

async fn sweep(state: &Mutex<State>) {
    let metrics = get_metrics().await;
    let (removed, remaining) = {
        let mut state = state.lock().await;
        let now = Instant::now();
        let removed = state.registry.sweep(now);
        (removed, state.registry.len())
    };
    metrics.tokens_swept.inc_by(removed as u64);
    metrics.registry_size.set(remaining as i64);
    debug!("sweep removed {} expired records, {} remain", removed, remaining);
}

fn sweep_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
