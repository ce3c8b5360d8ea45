use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::observability::metrics::get_metrics;
use crate::store::error::StoreError;
use crate::store::generator::{EntropyTier, Generator};
use crate::store::hasher::{HashAlgorithm, TokenHasher};
use crate::store::reaper::{Reaper, ReaperHandle};
use crate::store::registry::{Lookup, Registry};

pub const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Parameters applied by [`TokenStore::start`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub valid_duration: Duration,
    pub sweep_interval: Duration,
    pub token_length: usize,
    pub hash: HashAlgorithm,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            valid_duration: DEFAULT_VALID_DURATION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            token_length: DEFAULT_TOKEN_LENGTH,
            hash: HashAlgorithm::default(),
        }
    }
}

impl StoreSettings {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_token_length(self.token_length)?;
        validate_sweep_interval(self.sweep_interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Everything guarded by the registry lock.
///
/// `epoch` changes on every start, so work hashed under a previous
/// configuration can be recognised once the lock is taken again.
pub(crate) struct State {
    pub(crate) phase: Phase,
    pub(crate) epoch: u64,
    pub(crate) hash: HashAlgorithm,
    pub(crate) registry: Registry,
}

struct Inner {
    state: Arc<Mutex<State>>,
    reaper: Mutex<Option<ReaperHandle>>,
    generator: Generator,
    token_length: AtomicUsize,
    valid_duration_nanos: AtomicU64,
    sweep_tx: watch::Sender<Duration>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.cancel();
        }
    }
}

/// Handle to a token store. Clones share the same registry.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::with_generator(Generator::new())
    }

    pub fn with_generator(generator: Generator) -> Self {
        let defaults = StoreSettings::default();
        let (sweep_tx, _) = watch::channel(defaults.sweep_interval);
        Self {
            inner: Arc::new(Inner {
                state: Arc::new(Mutex::new(State {
                    phase: Phase::Idle,
                    epoch: 0,
                    hash: defaults.hash,
                    registry: Registry::new(),
                })),
                reaper: Mutex::new(None),
                generator,
                token_length: AtomicUsize::new(defaults.token_length),
                valid_duration_nanos: AtomicU64::new(as_nanos(defaults.valid_duration)),
                sweep_tx,
            }),
        }
    }

    /// (Re)starts the store: applies `settings`, discards every record and
    /// replaces any running reaper with a fresh one.
    pub async fn start(&self, settings: StoreSettings) -> Result<(), StoreError> {
        settings.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let mut reaper = self.inner.reaper.lock().await;
        if let Some(previous) = reaper.take() {
            info!("restarting token store, previous tokens are discarded");
            previous.shutdown().await;
        }

        self.inner.generator.reseed();
        self.inner.token_length.store(settings.token_length, Ordering::Relaxed);
        self.set_valid_duration(settings.valid_duration);
        self.inner.sweep_tx.send_replace(settings.sweep_interval);

        {
            let mut state = self.inner.state.lock().await;
            state.registry.clear();
            state.hash = settings.hash.clone();
            state.epoch = state.epoch.wrapping_add(1);
            state.phase = Phase::Running;
        }

        *reaper = Some(ReaperHandle::spawn(
            &runtime,
            Reaper::new(self.inner.state.clone(), self.inner.sweep_tx.subscribe()),
        ));
        info!(
            "token store started: valid {:?}, sweep every {:?}, length {}, hash {:?}",
            settings.valid_duration, settings.sweep_interval, settings.token_length, settings.hash
        );
        Ok(())
    }

    /// Stops sweeping and wipes the registry. Once this returns every
    /// checkout reports false.
    pub async fn stop(&self) {
        let mut reaper = self.inner.reaper.lock().await;
        let Some(handle) = reaper.take() else {
            debug!("stop requested but token store is not running");
            return;
        };
        self.inner.state.lock().await.phase = Phase::Stopped;
        handle.shutdown().await;
        info!("token store stopped");
    }

    /// Issues a new token. The plaintext is returned once and never stored.
    pub async fn new_token(&self) -> Result<String, StoreError> {
        let metrics = get_metrics().await;
        loop {
            let (epoch, hash) = self.running_hash().await?;
            let generated = self.inner.generator.generate(self.token_length());
            if generated.tier == EntropyTier::Fallback {
                metrics.entropy_fallbacks.inc();
            }
            let digest = hash.digest(&generated.token);

            let mut state = self.inner.state.lock().await;
            if state.phase != Phase::Running {
                return Err(StoreError::Stopped);
            }
            if state.epoch != epoch {
                // restarted while hashing, the digest belongs to the old configuration
                continue;
            }
            let expires_at = Instant::now() + self.valid_duration();
            if state.registry.insert_unique(digest, expires_at) {
                metrics.registry_size.set(state.registry.len() as i64);
                drop(state);
                metrics.tokens_issued.inc();
                return Ok(generated.token);
            }
            drop(state);
            metrics.digest_collisions.inc();
            debug!("token digest collision, regenerating");
        }
    }

    /// Validates a token and slides its expiry forward.
    pub async fn checkout(&self, token: &str) -> Result<bool, StoreError> {
        let Some((epoch, digest)) = self.digest_for(token).await? else {
            return Ok(false);
        };
        let (outcome, remaining) = {
            let mut state = self.inner.state.lock().await;
            let outcome = if state.epoch != epoch {
                Lookup::Absent
            } else {
                let now = Instant::now();
                state.registry.checkout(&digest, now, now + self.valid_duration())
            };
            (outcome, state.registry.len())
        };
        record_outcome(outcome, remaining).await;
        Ok(outcome.is_valid())
    }

    /// Invalidates a token. No-op if it is unknown.
    pub async fn drop_token(&self, token: &str) -> Result<(), StoreError> {
        let Some((epoch, digest)) = self.digest_for(token).await? else {
            return Ok(());
        };
        let (removed, remaining) = {
            let mut state = self.inner.state.lock().await;
            let removed = state.epoch == epoch && state.registry.remove(&digest);
            (removed, state.registry.len())
        };
        if removed {
            let metrics = get_metrics().await;
            metrics.tokens_dropped.inc();
            metrics.registry_size.set(remaining as i64);
        }
        Ok(())
    }

    /// Single-use redemption: true only if the token was valid, and it is
    /// gone afterwards either way.
    pub async fn checkout_and_drop(&self, token: &str) -> Result<bool, StoreError> {
        let Some((epoch, digest)) = self.digest_for(token).await? else {
            return Ok(false);
        };
        let (outcome, remaining) = {
            let mut state = self.inner.state.lock().await;
            let outcome = if state.epoch != epoch {
                Lookup::Absent
            } else {
                state.registry.redeem(&digest, Instant::now())
            };
            (outcome, state.registry.len())
        };
        record_outcome(outcome, remaining).await;
        if outcome.is_valid() {
            get_metrics().await.tokens_dropped.inc();
        }
        Ok(outcome.is_valid())
    }

    pub fn set_token_length(&self, length: usize) -> Result<(), StoreError> {
        validate_token_length(length)?;
        self.inner.token_length.store(length, Ordering::Relaxed);
        Ok(())
    }

    /// Applies to tokens issued or renewed from now on.
    pub fn set_valid_duration(&self, duration: Duration) {
        self.inner
            .valid_duration_nanos
            .store(as_nanos(duration), Ordering::Relaxed);
    }

    /// Changes the sweep cadence of the running reaper and of later starts.
    pub fn set_sweep_interval(&self, interval: Duration) -> Result<(), StoreError> {
        validate_sweep_interval(interval)?;
        self.inner.sweep_tx.send_replace(interval);
        Ok(())
    }

    pub fn token_length(&self) -> usize {
        self.inner.token_length.load(Ordering::Relaxed)
    }

    pub fn valid_duration(&self) -> Duration {
        Duration::from_nanos(self.inner.valid_duration_nanos.load(Ordering::Relaxed))
    }

    pub fn sweep_interval(&self) -> Duration {
        *self.inner.sweep_tx.borrow()
    }

    /// True once the secure random source has failed and tokens were
    /// generated from the fallback.
    pub fn entropy_degraded(&self) -> bool {
        self.inner.generator.degraded()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.phase == Phase::Running
    }

    /// Number of records currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.registry.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn running_hash(&self) -> Result<(u64, HashAlgorithm), StoreError> {
        let state = self.inner.state.lock().await;
        match state.phase {
            Phase::Idle => Err(StoreError::NotStarted),
            Phase::Stopped => Err(StoreError::Stopped),
            Phase::Running => Ok((state.epoch, state.hash.clone())),
        }
    }

    /// Hashes outside the lock. `None` means the store is stopped and every
    /// token is absent.
    async fn digest_for(&self, token: &str) -> Result<Option<(u64, String)>, StoreError> {
        match self.running_hash().await {
            Ok((epoch, hash)) => Ok(Some((epoch, hash.digest(token)))),
            Err(StoreError::Stopped) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn record_outcome(outcome: Lookup, remaining: usize) {
    let metrics = get_metrics().await;
    metrics
        .checkouts
        .with_label_values(&[outcome.as_str()])
        .inc();
    metrics.registry_size.set(remaining as i64);
}

fn validate_token_length(length: usize) -> Result<(), StoreError> {
    if length == 0 {
        return Err(StoreError::InvalidSettings("token length must be positive".into()));
    }
    Ok(())
}

fn validate_sweep_interval(interval: Duration) -> Result<(), StoreError> {
    if interval.is_zero() {
        return Err(StoreError::InvalidSettings("sweep interval must be positive".into()));
    }
    Ok(())
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
