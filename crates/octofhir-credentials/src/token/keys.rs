//! Signing key selection, rotation and JWKS export.
//!
//! # Rotation Policy
//!
//! - New keys are created inactive, then activated.
//! - The newest active key (by `created_at`, ties broken by `kid`) signs
//!   new tokens.
//! - Deactivation stamps a deletion deadline `now + key_retention`; until
//!   then the key still resolves by `kid` for verification and appears in
//!   the JWKS.
//! - [`KeyRotationService::purge_expired`] deletes keys past their deadline.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use elliptic_curve::sec1::ToEncodedPoint;
use rsa::RsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditLogger};
use crate::crypto::{KeyGeneratorRegistry, PrivateKeyEncryptionService};
use crate::error::{AuthError, AuthResult};
use crate::storage::KeyRepository;
use crate::token::expires_after;
use crate::types::{EcCurve, NewSigningKey, SigningAlgorithm, SigningKey};

// ============================================================================
// Selection
// ============================================================================

/// Picks the key that signs new tokens.
#[derive(Clone)]
pub struct SigningKeySelector {
    keys: Arc<dyn KeyRepository>,
}

impl SigningKeySelector {
    /// Creates a selector over `keys`.
    #[must_use]
    pub fn new(keys: Arc<dyn KeyRepository>) -> Self {
        Self { keys }
    }

    /// Returns the newest active key.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveKey` if no key is active.
    pub async fn select(&self) -> AuthResult<SigningKey> {
        let mut active: Vec<SigningKey> = self
            .keys
            .find_active_keys()
            .await?
            .into_iter()
            .filter(|key| key.is_active)
            .collect();

        active.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.kid.cmp(&b.kid))
        });

        match active.into_iter().next() {
            Some(key) => Ok(key),
            None => {
                tracing::error!("No active signing key; token issuance is halted");
                Err(AuthError::NoActiveKey)
            }
        }
    }
}

// ============================================================================
// JWKS
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Finds a key by `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// JSON Web Key (public part only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    // RSA-specific fields
    /// RSA modulus (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // EC-specific fields
    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

macro_rules! ec_coordinates {
    ($curve:ident, $pem:expr) => {{
        let public_key = $curve::PublicKey::from_public_key_pem($pem)
            .map_err(|e| AuthError::key_generation(format!("invalid public key: {e}")))?;
        let point = public_key.to_encoded_point(false);
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => (URL_SAFE_NO_PAD.encode(x), URL_SAFE_NO_PAD.encode(y)),
            _ => {
                return Err(AuthError::key_generation(
                    "public key is the point at infinity",
                ));
            }
        }
    }};
}

impl Jwk {
    /// Exports the public half of a stored key.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` if the stored public key does not parse.
    pub fn from_signing_key(key: &SigningKey) -> AuthResult<Self> {
        let mut jwk = Self {
            kty: String::new(),
            kid: key.kid.clone(),
            use_: "sig".to_string(),
            alg: key.algorithm.as_str().to_string(),
            n: None,
            e: None,
            crv: None,
            x: None,
            y: None,
        };

        match key.algorithm.curve() {
            None => {
                let public_key = RsaPublicKey::from_public_key_pem(&key.public_key)
                    .map_err(|e| AuthError::key_generation(format!("invalid public key: {e}")))?;
                jwk.kty = "RSA".to_string();
                jwk.n = Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()));
                jwk.e = Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()));
            }
            Some(curve) => {
                let (x, y) = match curve {
                    EcCurve::P256 => ec_coordinates!(p256, &key.public_key),
                    EcCurve::P384 => ec_coordinates!(p384, &key.public_key),
                    EcCurve::P521 => ec_coordinates!(p521, &key.public_key),
                };
                jwk.kty = "EC".to_string();
                jwk.crv = Some(curve.as_str().to_string());
                jwk.x = Some(x);
                jwk.y = Some(y);
            }
        }

        Ok(jwk)
    }
}

// ============================================================================
// Rotation
// ============================================================================

/// Administrative key lifecycle: create, activate, deactivate, purge.
pub struct KeyRotationService {
    keys: Arc<dyn KeyRepository>,
    encryption: Arc<PrivateKeyEncryptionService>,
    generators: KeyGeneratorRegistry,
    default_algorithm: SigningAlgorithm,
    retention: Duration,
    audit: Arc<dyn AuditLogger>,
}

impl KeyRotationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        keys: Arc<dyn KeyRepository>,
        encryption: Arc<PrivateKeyEncryptionService>,
        generators: KeyGeneratorRegistry,
        default_algorithm: SigningAlgorithm,
        retention: Duration,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            keys,
            encryption,
            generators,
            default_algorithm,
            retention,
            audit,
        }
    }

    /// Algorithm used by [`rotate`](Self::rotate).
    #[must_use]
    pub fn default_algorithm(&self) -> SigningAlgorithm {
        self.default_algorithm
    }

    /// Generates, encrypts and stores a new inactive key.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` if no generator supports `algorithm`,
    /// `Encryption` if the private key cannot be protected, or a storage
    /// error.
    pub async fn create_key(&self, algorithm: SigningAlgorithm) -> AuthResult<SigningKey> {
        let pair = self.generators.generate(algorithm)?;
        let private_key_encrypted = self.encryption.encrypt(&pair.private_key_pem)?;

        let key = self
            .keys
            .create(NewSigningKey {
                kid: Uuid::new_v4().to_string(),
                algorithm,
                public_key: pair.public_key_pem,
                private_key_encrypted,
            })
            .await?;

        tracing::info!(kid = %key.kid, alg = %algorithm, "Created signing key");
        self.audit
            .log(AuditEvent::SigningKeyCreated {
                kid: key.kid.clone(),
                algorithm: algorithm.as_str().to_string(),
            })
            .await;

        Ok(key)
    }

    /// Makes a key eligible for signing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if no key has this `kid`.
    pub async fn activate(&self, kid: &str) -> AuthResult<()> {
        if !self.keys.activate(kid).await? {
            return Err(AuthError::invalid_argument(format!(
                "unknown signing key '{kid}'"
            )));
        }

        tracing::info!(kid, "Activated signing key");
        self.audit
            .log(AuditEvent::SigningKeyActivated {
                kid: kid.to_string(),
            })
            .await;
        Ok(())
    }

    /// Stops a key from signing and schedules its deletion after the
    /// retention period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if no key has this `kid`.
    pub async fn deactivate(&self, kid: &str) -> AuthResult<()> {
        let retain_until = expires_after(self.retention)?;
        if !self.keys.deactivate(kid, retain_until).await? {
            return Err(AuthError::invalid_argument(format!(
                "unknown signing key '{kid}'"
            )));
        }

        tracing::info!(kid, %retain_until, "Deactivated signing key");
        self.audit
            .log(AuditEvent::SigningKeyDeactivated {
                kid: kid.to_string(),
            })
            .await;
        Ok(())
    }

    /// Creates and activates a key with the default algorithm, then
    /// deactivates every previously active key.
    ///
    /// The new key is active before the old ones stop signing.
    ///
    /// # Errors
    ///
    /// Propagates failures of the individual steps.
    pub async fn rotate(&self) -> AuthResult<SigningKey> {
        let previous = self.keys.find_active_keys().await?;

        let mut key = self.create_key(self.default_algorithm).await?;
        self.activate(&key.kid).await?;
        key.is_active = true;

        for old in previous.iter().filter(|old| old.kid != key.kid) {
            self.deactivate(&old.kid).await?;
        }

        Ok(key)
    }

    /// Rotates only if no key is active. Returns the key that will sign.
    ///
    /// # Errors
    ///
    /// Propagates storage and generation failures.
    pub async fn ensure_active_key(&self) -> AuthResult<SigningKey> {
        match SigningKeySelector::new(self.keys.clone()).select().await {
            Ok(key) => Ok(key),
            Err(AuthError::NoActiveKey) => self.rotate().await,
            Err(e) => Err(e),
        }
    }

    /// Deletes inactive keys past their retention deadline.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let count = self.keys.delete_expired().await?;
        if count > 0 {
            tracing::info!(count, "Purged retained signing keys");
            self.audit
                .log(AuditEvent::SigningKeysPurged { count })
                .await;
        }
        Ok(count)
    }

    /// Public keys of every active or retained key.
    ///
    /// # Errors
    ///
    /// Returns a storage error or `KeyGeneration` for an unparseable stored
    /// public key.
    pub async fn jwks(&self) -> AuthResult<Jwks> {
        let mut keys: Vec<SigningKey> = self
            .keys
            .find_all()
            .await?
            .into_iter()
            .filter(|key| !key.is_expired())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let keys = keys
            .iter()
            .map(Jwk::from_signing_key)
            .collect::<AuthResult<Vec<_>>>()?;
        Ok(Jwks { keys })
    }
}
