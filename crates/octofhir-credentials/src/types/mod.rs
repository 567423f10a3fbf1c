//! Domain types shared by the engine, its repositories and its callers.
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`AuthorizationCode`] - single-use authorization code
//! - [`RefreshToken`] - rotating refresh token
//! - [`TokenBlacklistEntry`] - revoked access token `jti`
//! - [`SigningKey`] - JWS signing key pair with encrypted private half
//! - [`ScopeSet`] - space-delimited OAuth scopes

pub mod authorization_code;
pub mod blacklist;
pub mod client;
pub mod refresh_token;
pub mod scope;
pub mod signing_key;

pub use authorization_code::{AuthorizationCode, NewAuthorizationCode};
pub use blacklist::TokenBlacklistEntry;
pub use client::{Client, ClientValidationError, GrantType};
pub use refresh_token::{NewRefreshToken, RefreshToken};
pub use scope::ScopeSet;
pub use signing_key::{EcCurve, NewSigningKey, SigningAlgorithm, SigningKey};
