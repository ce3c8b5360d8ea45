// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;

use crate::store::{EntropySource, HashAlgorithm, StoreSettings, TokenStore};

pub fn settings(valid: Duration, sweep: Duration) -> StoreSettings {
    StoreSettings {
        valid_duration: valid,
        sweep_interval: sweep,
        token_length: 32,
        hash: HashAlgorithm::Sha256,
    }
}

pub async fn started_store(valid: Duration, sweep: Duration) -> TokenStore {
    let store = TokenStore::new();
    store.start(settings(valid, sweep)).await.expect("start store");
    store
}

/// Fills each request with the next scripted byte; fails once exhausted.
pub struct ScriptedEntropy {
    fills: Mutex<VecDeque<u8>>,
}

impl ScriptedEntropy {
    pub fn new(values: &[u8]) -> Self {
        Self {
            fills: Mutex::new(values.iter().copied().collect()),
        }
    }
}

impl EntropySource for ScriptedEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        let value = self
            .fills
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| rand::Error::new(io::Error::other("script exhausted")))?;
        dest.fill(value);
        Ok(())
    }
}

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}
