//! Token generation, validation, and lifecycle management.
//!
//! This module provides:
//!
//! - Access token signing and verification ([`JwtIssuer`], [`JwtVerifier`])
//! - Signing key selection and rotation ([`KeyRotationService`])
//! - Authorization code and refresh token lifecycles
//! - The access token blacklist

pub mod authorization_code;
pub mod blacklist;
pub mod jwt;
pub mod keys;
pub mod refresh_token;

use std::time::Duration;

use time::OffsetDateTime;

use crate::error::{AuthError, AuthResult};

pub use authorization_code::{AuthorizationCodeLifecycle, AuthorizationCodeRequest};
pub use blacklist::TokenBlacklist;
pub use jwt::{
    AccessTokenClaims, AccessTokenPayload, IssuedToken, JwtHeader, JwtIssuer, JwtVerifier,
    REGISTERED_CLAIMS,
};
pub use keys::{Jwk, Jwks, KeyRotationService, SigningKeySelector};
pub use refresh_token::{IssuedRefreshToken, RefreshTokenLifecycle};

/// Returns `now + lifetime`.
pub(crate) fn expires_after(lifetime: Duration) -> AuthResult<OffsetDateTime> {
    time::Duration::try_from(lifetime)
        .ok()
        .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
        .ok_or_else(|| AuthError::configuration("lifetime is out of range"))
}

/// Converts a configured lifetime to whole seconds for `exp`/`expires_in`.
pub(crate) fn lifetime_secs(lifetime: Duration) -> AuthResult<i64> {
    i64::try_from(lifetime.as_secs())
        .map_err(|_| AuthError::configuration("lifetime is out of range"))
}
