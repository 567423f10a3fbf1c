//! In-memory repositories for the OctoFHIR credential engine.
//!
//! This crate implements every repository trait from
//! `octofhir_credentials::storage` on top of `DashMap`, for tests, local
//! development and single-instance deployments. Codes and refresh tokens are
//! keyed by their SHA-256 hash; plaintext is never retained.
//!
//! # Example
//!
//! ```ignore
//! use octofhir_credentials::TokenEngine;
//! use octofhir_credentials_memory::InMemoryCredentialStore;
//!
//! let store = InMemoryCredentialStore::new();
//! store.clients.insert(client)?;
//!
//! let engine = TokenEngine::builder(config, store.repositories()).build()?;
//! ```

pub mod audit;
pub mod authorization_code;
pub mod blacklist;
pub mod client;
pub mod refresh_token;
pub mod signing_key;

use std::sync::Arc;

use octofhir_credentials::engine::Repositories;

pub use audit::InMemoryAuditLogger;
pub use authorization_code::InMemoryAuthorizationCodeRepository;
pub use blacklist::InMemoryTokenBlacklistRepository;
pub use client::InMemoryClientRepository;
pub use refresh_token::InMemoryRefreshTokenRepository;
pub use signing_key::InMemoryKeyRepository;

/// All in-memory repositories, shareable with the engine.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    pub clients: Arc<InMemoryClientRepository>,
    pub authorization_codes: Arc<InMemoryAuthorizationCodeRepository>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
    pub blacklist: Arc<InMemoryTokenBlacklistRepository>,
    pub keys: Arc<InMemoryKeyRepository>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store as the engine's repository set. The store keeps
    /// sharing the same state.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            clients: self.clients.clone(),
            authorization_codes: self.authorization_codes.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            blacklist: self.blacklist.clone(),
            keys: self.keys.clone(),
        }
    }
}
