//! # Token Holder Library
//!
//! Issues short-lived opaque tokens, validates them with a sliding expiry,
//! and reclaims expired ones in the background. A small template holder
//! renders pages that embed freshly issued tokens.
//!
//! Modules:
//! - `store` — token generation, hashing, registry and reaper
//! - `templates` — directory-backed templates
//! - `config` — service configuration
//! - `server` — HTTP surface over the store and templates
//! - `observability` — prometheus metrics

pub mod config;
pub mod observability;
pub mod server;
pub mod store;
pub mod templates;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::store::{HashAlgorithm, StoreError, StoreSettings, TokenStore};
pub use crate::templates::{TemplateError, TemplateHolder};
