use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, warn};

/// First byte of the token alphabet ('0').
pub const ALPHABET_START: u8 = 48;
/// Number of symbols in the token alphabet, '0'..='z'.
pub const ALPHABET_LEN: u8 = 75;

// Largest multiple of ALPHABET_LEN that fits in a byte; bytes at or above it
// are rejected so that `byte % ALPHABET_LEN` stays uniform.
const REJECT_FROM: u8 = ALPHABET_LEN * 3;
const CHUNK: usize = 64;

/// Cryptographically strong byte source used for tokens.
pub trait EntropySource: Send + Sync {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

/// Operating system randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Which source produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyTier {
    Secure,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub token: String,
    pub tier: EntropyTier,
}

/// Two-tier token generator.
///
/// Tokens come from the primary [`EntropySource`]. If it fails at any point
/// the whole buffer is regenerated from a seeded [`StdRng`]. The first
/// failure is logged as a warning; later ones only at debug level.
pub struct Generator {
    primary: Box<dyn EntropySource>,
    fallback: Mutex<StdRng>,
    fallback_reported: AtomicBool,
}

impl Generator {
    pub fn new() -> Self {
        Self::with_source(OsEntropy)
    }

    pub fn with_source(source: impl EntropySource + 'static) -> Self {
        Self {
            primary: Box::new(source),
            fallback: Mutex::new(StdRng::seed_from_u64(fallback_seed())),
            fallback_reported: AtomicBool::new(false),
        }
    }

    /// Reseeds the fallback generator from the clock and process id.
    pub fn reseed(&self) {
        let mut rng = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
        *rng = StdRng::seed_from_u64(fallback_seed());
    }

    /// True once the primary source has failed at least once.
    pub fn degraded(&self) -> bool {
        self.fallback_reported.load(Ordering::Relaxed)
    }

    pub fn generate(&self, length: usize) -> Generated {
        let mut buf = vec![0u8; length];
        match self.fill_secure(&mut buf) {
            Ok(()) => Generated {
                token: into_token(buf),
                tier: EntropyTier::Secure,
            },
            Err(err) => {
                if !self.fallback_reported.swap(true, Ordering::Relaxed) {
                    warn!("secure random source failed, using seeded fallback: {}", err);
                } else {
                    debug!("secure random source failed again: {}", err);
                }
                self.fill_fallback(&mut buf);
                Generated {
                    token: into_token(buf),
                    tier: EntropyTier::Fallback,
                }
            }
        }
    }

    fn fill_secure(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        let mut chunk = [0u8; CHUNK];
        let mut filled = 0;
        while filled < buf.len() {
            self.primary.try_fill(&mut chunk)?;
            for &byte in chunk.iter().filter(|b| **b < REJECT_FROM) {
                buf[filled] = ALPHABET_START + byte % ALPHABET_LEN;
                filled += 1;
                if filled == buf.len() {
                    break;
                }
            }
        }
        Ok(())
    }

    fn fill_fallback(&self, buf: &mut [u8]) {
        let mut rng = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
        for byte in buf.iter_mut() {
            *byte = ALPHABET_START + rng.gen_range(0..ALPHABET_LEN);
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn in_alphabet(byte: u8) -> bool {
    (ALPHABET_START..ALPHABET_START + ALPHABET_LEN).contains(&byte)
}

fn into_token(buf: Vec<u8>) -> String {
    buf.into_iter().map(char::from).collect()
}

fn fallback_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    mix_seed(nanos, std::process::id())
}

/// Clock nanoseconds plus pid, wrapping on overflow.
fn mix_seed(nanos: u64, pid: u32) -> u64 {
    nanos.wrapping_add(u64::from(pid))
}
