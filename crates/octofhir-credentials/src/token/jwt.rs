//! JWT access token issuance and verification.
//!
//! Access tokens follow the RFC 9068 profile: compact JWS with header
//! `{alg, kid, typ: "JWT"}` and claims `iss, sub, aud, exp, iat, jti, scope`
//! plus optional `nbf`, `client_id` and caller-supplied extras.
//!
//! ## Example
//!
//! ```ignore
//! let payload = AccessTokenPayload::new("user-123", "client-456", "read write", 3600)?
//!     .with_client_id("client-456");
//! let issued = issuer.generate(&payload).await?;
//! let claims = verifier.verify(&issued.token).await?;
//! assert_eq!(claims.sub, "user-123");
//! ```

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::crypto::{PrivateKeyEncryptionService, jws};
use crate::error::{AuthError, AuthResult};
use crate::storage::{KeyRepository, TokenBlacklistRepository};
use crate::token::keys::SigningKeySelector;
use crate::types::SigningAlgorithm;

/// Claim names the issuer sets itself. Extra claims may not override them.
pub const REGISTERED_CLAIMS: [&str; 9] = [
    "iss",
    "sub",
    "aud",
    "exp",
    "iat",
    "jti",
    "scope",
    "nbf",
    "client_id",
];

// ============================================================================
// Payload
// ============================================================================

/// Validated input for [`JwtIssuer::generate`].
///
/// Every constructor checks its arguments so invalid payloads fail before
/// any key lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenPayload {
    subject: String,
    audience: String,
    scope: String,
    expires_in: i64,
    client_id: Option<String>,
    not_before: Option<i64>,
    additional_claims: Map<String, Value>,
}

impl AccessTokenPayload {
    /// Creates a payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `subject`, `audience` or `scope` is blank
    /// or `expires_in` is not positive.
    pub fn new(
        subject: impl Into<String>,
        audience: impl Into<String>,
        scope: impl Into<String>,
        expires_in: i64,
    ) -> AuthResult<Self> {
        let subject = subject.into();
        let audience = audience.into();
        let scope = scope.into();

        for (name, value) in [
            ("subject", &subject),
            ("audience", &audience),
            ("scope", &scope),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::invalid_argument(format!(
                    "access token {name} must not be empty"
                )));
            }
        }
        if expires_in <= 0 {
            return Err(AuthError::invalid_argument(format!(
                "access token lifetime must be positive, got {expires_in}"
            )));
        }

        Ok(Self {
            subject,
            audience,
            scope,
            expires_in,
            client_id: None,
            not_before: None,
            additional_claims: Map::new(),
        })
    }

    /// Sets the `client_id` claim.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the `nbf` claim (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a negative timestamp.
    pub fn with_not_before(mut self, not_before: i64) -> AuthResult<Self> {
        if not_before < 0 {
            return Err(AuthError::invalid_argument(format!(
                "nbf must not be negative, got {not_before}"
            )));
        }
        self.not_before = Some(not_before);
        Ok(self)
    }

    /// Adds an extra claim.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `name` is one of [`REGISTERED_CLAIMS`].
    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> AuthResult<Self> {
        let name = name.into();
        if REGISTERED_CLAIMS.contains(&name.as_str()) {
            return Err(AuthError::invalid_argument(format!(
                "claim '{name}' is set by the issuer"
            )));
        }
        self.additional_claims.insert(name, value);
        Ok(self)
    }

    /// Token subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Token audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Space-delimited scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Lifetime in seconds.
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }
}

// ============================================================================
// Claims and Header
// ============================================================================

/// Claims carried by an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user or client ID).
    pub sub: String,

    /// Audience.
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT ID (unique identifier for revocation).
    pub jti: String,

    /// Space-separated scopes.
    pub scope: String,

    /// Not before (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// OAuth client ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Additional claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JOSE header of an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtHeader {
    /// Signature algorithm.
    pub alg: String,

    /// Signing key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact serialization.
    pub token: String,
    /// Claims that were signed.
    pub claims: AccessTokenClaims,
    /// Key identifier used.
    pub kid: String,
    /// Algorithm used.
    pub algorithm: SigningAlgorithm,
}

impl IssuedToken {
    /// The token's `jti`.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Lifetime in seconds as reported in `expires_in`.
    #[must_use]
    pub fn expires_in(&self) -> u64 {
        u64::try_from(self.claims.exp - self.claims.iat).unwrap_or(0)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> AuthResult<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::internal(format!("Failed to serialize JWT segment: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> AuthResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::invalid_token(format!("malformed JWT {what}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::invalid_token(format!("malformed JWT {what}")))
}

// ============================================================================
// Issuer
// ============================================================================

/// Signs access tokens with the newest active signing key.
///
/// The private key is decrypted for each call and dropped (zeroized) before
/// `generate` returns.
pub struct JwtIssuer {
    issuer: String,
    selector: SigningKeySelector,
    encryption: Arc<PrivateKeyEncryptionService>,
}

impl JwtIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        keys: Arc<dyn KeyRepository>,
        encryption: Arc<PrivateKeyEncryptionService>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            selector: SigningKeySelector::new(keys),
            encryption,
        }
    }

    /// The `iss` value placed in every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Builds and signs an access token.
    ///
    /// # Errors
    ///
    /// - `NoActiveKey` if no key is active
    /// - `Encryption` if the stored private key cannot be decrypted
    /// - `Signing` if the key does not parse or signing fails
    pub async fn generate(&self, payload: &AccessTokenPayload) -> AuthResult<IssuedToken> {
        let key = self.selector.select().await?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: payload.subject.clone(),
            aud: payload.audience.clone(),
            exp: now + payload.expires_in,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            scope: payload.scope.clone(),
            nbf: payload.not_before,
            client_id: payload.client_id.clone(),
            extra: payload.additional_claims.clone(),
        };
        let header = JwtHeader {
            alg: key.algorithm.as_str().to_string(),
            kid: Some(key.kid.clone()),
            typ: Some("JWT".to_string()),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = {
            let private_key = self.encryption.decrypt(&key.private_key_encrypted)?;
            jws::sign_compact(key.algorithm, &private_key, &signing_input)?
        };

        tracing::debug!(kid = %key.kid, jti = %claims.jti, alg = %key.algorithm, "Signed access token");

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            claims,
            kid: key.kid,
            algorithm: key.algorithm,
        })
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Verifies access tokens issued by [`JwtIssuer`].
///
/// Keys are resolved by `kid` among active and retained keys, so tokens
/// signed before a rotation keep verifying until the old key is purged.
pub struct JwtVerifier {
    issuer: String,
    keys: Arc<dyn KeyRepository>,
    blacklist: Option<Arc<dyn TokenBlacklistRepository>>,
    leeway: i64,
}

impl JwtVerifier {
    /// Creates a verifier that does not consult a blacklist.
    #[must_use]
    pub fn new(issuer: impl Into<String>, keys: Arc<dyn KeyRepository>) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
            blacklist: None,
            leeway: 0,
        }
    }

    /// Rejects tokens whose `jti` is blacklisted.
    #[must_use]
    pub fn with_blacklist(mut self, blacklist: Arc<dyn TokenBlacklistRepository>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    /// Clock skew tolerance in seconds for `exp` and `nbf`.
    #[must_use]
    pub fn with_leeway(mut self, seconds: i64) -> Self {
        self.leeway = seconds.max(0);
        self
    }

    /// Fully verifies a token: signature, issuer, `exp`, `nbf` and blacklist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for any verification failure.
    pub async fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let claims = self.verify_signature(token).await?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        if claims.exp + self.leeway <= now {
            return Err(AuthError::invalid_token("token has expired"));
        }
        if claims.nbf.is_some_and(|nbf| nbf - self.leeway > now) {
            return Err(AuthError::invalid_token("token is not yet valid"));
        }

        if let Some(blacklist) = &self.blacklist
            && blacklist.is_blacklisted(&claims.jti).await?
        {
            tracing::debug!(jti = %claims.jti, "Rejected blacklisted token");
            return Err(AuthError::invalid_token("token has been revoked"));
        }

        Ok(claims)
    }

    /// Verifies signature and issuer only, ignoring time claims and the
    /// blacklist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is malformed, its key is unknown
    /// or purged, the header algorithm disagrees with the key, the signature
    /// fails, or the issuer differs.
    pub async fn verify_signature(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::invalid_token("JWT must have three segments"));
        };

        let header: JwtHeader = decode_segment(header_b64, "header")?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::invalid_token("JWT header has no kid"))?;

        let key = self
            .keys
            .find_by_kid(&kid)
            .await?
            .filter(|key| !key.is_expired())
            .ok_or_else(|| AuthError::invalid_token("unknown signing key"))?;

        if header.alg != key.algorithm.as_str() {
            return Err(AuthError::invalid_token(
                "JWT algorithm does not match signing key",
            ));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::invalid_token("malformed JWT signature"))?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];

        if !jws::verify(
            key.algorithm,
            &key.public_key,
            signing_input.as_bytes(),
            &signature,
        )? {
            return Err(AuthError::invalid_token("signature verification failed"));
        }

        let claims: AccessTokenClaims = decode_segment(claims_b64, "claims")?;
        if claims.iss != self.issuer {
            return Err(AuthError::invalid_token("unexpected issuer"));
        }

        Ok(claims)
    }
}

/// Returns `true` if `value` has the shape of a compact JWS.
#[must_use]
pub fn looks_like_jwt(value: &str) -> bool {
    value.split('.').count() == 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_validation() {
        assert!(AccessTokenPayload::new("user-123", "client-456", "read write", 3600).is_ok());

        for (sub, aud, scope, exp) in [
            ("", "aud", "read", 60),
            ("sub", " ", "read", 60),
            ("sub", "aud", "", 60),
            ("sub", "aud", "read", 0),
            ("sub", "aud", "read", -5),
        ] {
            let err = AccessTokenPayload::new(sub, aud, scope, exp).unwrap_err();
            assert!(matches!(err, AuthError::InvalidArgument { .. }));
        }
    }

    #[test]
    fn test_payload_not_before() {
        let payload = AccessTokenPayload::new("s", "a", "read", 60).unwrap();
        assert!(payload.clone().with_not_before(0).is_ok());
        assert!(payload.with_not_before(-1).is_err());
    }

    #[test]
    fn test_payload_rejects_registered_claim_override() {
        let payload = AccessTokenPayload::new("s", "a", "read", 60).unwrap();
        for name in REGISTERED_CLAIMS {
            assert!(payload.clone().with_claim(name, Value::Null).is_err(), "{name}");
        }
        let payload = payload
            .with_claim("tenant", Value::String("acme".into()))
            .unwrap();
        assert_eq!(payload.additional_claims["tenant"], "acme");
    }

    #[test]
    fn test_claims_serialization() {
        let mut extra = Map::new();
        extra.insert("tenant".into(), Value::String("acme".into()));
        let claims = AccessTokenClaims {
            iss: "https://auth.example.com".into(),
            sub: "user-123".into(),
            aud: "client-456".into(),
            exp: 1_700_003_600,
            iat: 1_700_000_000,
            jti: "abc".into(),
            scope: "read write".into(),
            nbf: None,
            client_id: Some("client-456".into()),
            extra,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "user-123");
        assert_eq!(json["tenant"], "acme");
        assert!(json.get("nbf").is_none());

        let parsed: AccessTokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, claims);
    }

    #[test]
    fn test_looks_like_jwt() {
        assert!(looks_like_jwt("a.b.c"));
        assert!(!looks_like_jwt("5f0c7a1e-jti"));
        assert!(!looks_like_jwt("a.b.c.d"));
    }
}
