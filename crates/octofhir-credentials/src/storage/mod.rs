//! Repository traits for credential state.
//!
//! This module defines the storage seams of the engine:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - Refresh tokens
//! - Revoked access token identifiers
//! - Signing keys
//!
//! The engine always passes plaintext codes and tokens across these
//! interfaces. Implementations hash them (see
//! [`hash_token`](crate::crypto::hash_token)) before storage and lookup and
//! never return plaintext.
//!
//! # Implementations
//!
//! - `octofhir-credentials-memory` - in-memory backend

pub mod authorization_code;
pub mod blacklist;
pub mod client;
pub mod refresh_token;
pub mod signing_key;

pub use authorization_code::AuthorizationCodeRepository;
pub use blacklist::TokenBlacklistRepository;
pub use client::ClientRepository;
pub use refresh_token::RefreshTokenRepository;
pub use signing_key::KeyRepository;
