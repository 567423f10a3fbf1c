//! # octofhir-credentials
//!
//! OAuth 2.0 credential issuance and validation engine for the OctoFHIR
//! server.
//!
//! This crate provides:
//! - Token endpoint processing for the `authorization_code`, `refresh_token`
//!   and `client_credentials` grants
//! - Client authentication (`client_secret_basic`, `client_secret_post`,
//!   public clients)
//! - PKCE (RFC 7636) with `S256` and optional `plain`
//! - Signed JWT access tokens (RS256/384/512, ES256/384/512) with key
//!   rotation, encrypted private keys and JWKS export
//! - Rotating refresh tokens, single-use authorization codes and an access
//!   token blacklist
//! - Audit events for every issuance and revocation
//!
//! ## Overview
//!
//! [`TokenEngine`] is the entry point. It is built once from an
//! [`EngineConfig`] and a set of [`Repositories`]; persistence stays behind
//! the traits in [`storage`].
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration (TOML + environment)
//! - [`engine`] - The assembled engine
//! - [`oauth`] - Token endpoint: client authentication, PKCE, grants
//! - [`token`] - JWTs, signing keys, codes, refresh tokens, blacklist
//! - [`crypto`] - Secrets, hashing, key encryption, key generation, JWS
//! - [`audit`] - Security event audit logging
//! - [`storage`] - Repository traits
//! - [`types`] - Domain records

pub mod audit;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use audit::{AuditEvent, AuditLogger, NoopAuditLogger, TracingAuditLogger};
pub use config::{ConfigError, EngineConfig};
pub use engine::{
    GeneratedClientSecret, LogoutOutcome, PurgeReport, Repositories, TokenEngine,
    TokenEngineBuilder,
};
pub use error::{AuthError, AuthResult, EncryptionError, ErrorCategory, SecretValidationError};
pub use oauth::{TokenErrorResponse, TokenRequest, TokenResponse};
pub use storage::{
    AuthorizationCodeRepository, ClientRepository, KeyRepository, RefreshTokenRepository,
    TokenBlacklistRepository,
};
pub use token::{AccessTokenClaims, AccessTokenPayload, AuthorizationCodeRequest, Jwk, Jwks};
pub use types::{
    AuthorizationCode, Client, GrantType, RefreshToken, ScopeSet, SigningAlgorithm, SigningKey,
    TokenBlacklistEntry,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use octofhir_credentials::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditLogger};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Repositories, TokenEngine};
    pub use crate::error::{AuthError, AuthResult, ErrorCategory};
    pub use crate::oauth::{TokenErrorResponse, TokenRequest, TokenResponse};
    pub use crate::storage::{
        AuthorizationCodeRepository, ClientRepository, KeyRepository, RefreshTokenRepository,
        TokenBlacklistRepository,
    };
    pub use crate::token::{AccessTokenClaims, AuthorizationCodeRequest, Jwks};
    pub use crate::types::{Client, GrantType, ScopeSet, SigningAlgorithm};
}
