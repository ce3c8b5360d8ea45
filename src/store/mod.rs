//! In-memory issuer and validator of short-lived opaque tokens.
//!
//! Plaintext tokens leave the store exactly once, from [`TokenStore::new_token`].
//! Only their digests are kept, each with a sliding expiry that is refreshed on
//! every successful checkout and reclaimed by a background reaper.

pub mod error;
pub mod generator;
pub mod hasher;
pub mod reaper;
pub mod registry;
pub mod token_store;

pub use error::StoreError;
pub use generator::{EntropySource, EntropyTier, Generated, Generator, OsEntropy};
pub use hasher::{HashAlgorithm, TokenHasher};
pub use token_store::{StoreSettings, TokenStore};
