//! Signing key records and algorithms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// JWS algorithms supported for access-token signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// ECDSA P-256 with SHA-256.
    #[default]
    ES256,
    /// ECDSA P-384 with SHA-384.
    ES384,
    /// ECDSA P-521 with SHA-512.
    ES512,
}

impl SigningAlgorithm {
    /// All supported algorithms.
    pub const ALL: [SigningAlgorithm; 6] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// The JOSE `alg` value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    /// Returns `true` for the RSA family.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }

    /// Returns `true` for the ECDSA family.
    #[must_use]
    pub fn is_ecdsa(&self) -> bool {
        !self.is_rsa()
    }

    /// The curve an ECDSA algorithm signs on.
    #[must_use]
    pub fn curve(&self) -> Option<EcCurve> {
        match self {
            Self::ES256 => Some(EcCurve::P256),
            Self::ES384 => Some(EcCurve::P384),
            Self::ES512 => Some(EcCurve::P521),
            _ => None,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| format!("unsupported signing algorithm '{s}'"))
    }
}

/// NIST curves available for ECDSA signing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EcCurve {
    /// NIST P-256.
    #[default]
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384.
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521.
    #[serde(rename = "P-521")]
    P521,
}

impl EcCurve {
    /// The JWK `crv` name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// The JWS algorithm that signs on this curve.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::P256 => SigningAlgorithm::ES256,
            Self::P384 => SigningAlgorithm::ES384,
            Self::P521 => SigningAlgorithm::ES512,
        }
    }

    /// Length in bytes of one coordinate or scalar.
    #[must_use]
    pub fn field_size(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signing key pair as persisted by a [`KeyRepository`](crate::storage::KeyRepository).
///
/// Several keys may coexist during rotation. Only active keys sign new
/// tokens; inactive keys stay resolvable by `kid` until `expires_at` passes
/// and the retention sweep deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKey {
    /// Record identifier.
    pub id: Uuid,

    /// JOSE key identifier. Unique.
    pub kid: String,

    /// Algorithm this key signs with.
    pub algorithm: SigningAlgorithm,

    /// SPKI PEM public key.
    pub public_key: String,

    /// PKCS#8 PEM private key, encrypted with the master key.
    pub private_key_encrypted: String,

    /// Whether the key may sign new tokens.
    pub is_active: bool,

    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Deletion deadline, stamped on deactivation.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl SigningKey {
    /// Returns `true` once an inactive key is past its retention deadline.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        !self.is_active
            && self
                .expires_at
                .is_some_and(|deadline| deadline < OffsetDateTime::now_utc())
    }
}

/// Data for persisting a freshly generated key pair.
#[derive(Debug, Clone)]
pub struct NewSigningKey {
    /// Key identifier.
    pub kid: String,
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,
    /// SPKI PEM public key.
    pub public_key: String,
    /// Encrypted PKCS#8 PEM private key.
    pub private_key_encrypted: String,
}

impl NewSigningKey {
    /// Builds the stored record. New keys always start inactive.
    #[must_use]
    pub fn into_record(self) -> SigningKey {
        SigningKey {
            id: Uuid::new_v4(),
            kid: self.kid,
            algorithm: self.algorithm,
            public_key: self.public_key,
            private_key_encrypted: self.private_key_encrypted,
            is_active: false,
            created_at: OffsetDateTime::now_utc(),
            expires_at: None,
        }
    }
}
