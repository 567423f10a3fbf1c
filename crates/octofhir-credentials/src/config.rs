//! Credential engine configuration.
//!
//! Configuration is read once and handed to [`TokenEngine`](crate::TokenEngine)
//! at construction; it is never mutated afterwards.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::PrivateKeyEncryptionService;
use crate::crypto::keygen::ALLOWED_RSA_BITS;
use crate::types::SigningAlgorithm;

/// Environment variable overriding [`EngineConfig::key_encryption_key`].
pub const KEY_ENCRYPTION_KEY_ENV: &str = "OCTOFHIR_KEY_ENCRYPTION_KEY";

/// Environment variable overriding [`EngineConfig::issuer`].
pub const ISSUER_ENV: &str = "OCTOFHIR_ISSUER";

/// Root engine configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://auth.example.com"
/// key_encryption_key = "base64 of 32 random bytes"
///
/// [tokens]
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "30d"
///
/// [signing]
/// algorithm = "ES256"
/// key_retention = "24h"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Issuer URL placed in the `iss` claim.
    pub issuer: String,

    /// Audience for issued access tokens. Defaults to the client ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Base64-encoded 32-byte master key protecting signing keys at rest.
    #[serde(skip_serializing)]
    pub key_encryption_key: String,

    /// Token lifetimes.
    pub tokens: TokenConfig,

    /// PKCE policy.
    pub pkce: PkceConfig,

    /// Signing key policy.
    pub signing: SigningConfig,

    /// Audit settings.
    pub audit: AuditConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: None,
            key_encryption_key: String::new(),
            tokens: TokenConfig::default(),
            pkce: PkceConfig::default(),
            signing: SigningConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// Default lifetimes for issued credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

/// PKCE policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PkceConfig {
    /// Require PKCE for every public client, not only those flagged
    /// `pkce_required`.
    pub require_for_public_clients: bool,

    /// Accept the `plain` challenge method.
    pub allow_plain: bool,
}

impl Default for PkceConfig {
    fn default() -> Self {
        Self {
            require_for_public_clients: true,
            allow_plain: true,
        }
    }
}

/// Signing key policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Algorithm for newly generated keys. The ECDSA curve follows from it.
    pub algorithm: SigningAlgorithm,

    /// RSA modulus size for RS* keys.
    pub rsa_modulus_bits: usize,

    /// How long a deactivated key stays resolvable by `kid` before it may be
    /// deleted.
    #[serde(with = "humantime_serde")]
    pub key_retention: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::ES256,
            rsa_modulus_bits: 4096,
            key_retention: Duration::from_secs(24 * 3600),
        }
    }
}

/// Audit settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit audit events.
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds an invalid value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required field is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the TOML is malformed.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads configuration from a TOML file and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies `OCTOFHIR_ISSUER` and `OCTOFHIR_KEY_ENCRYPTION_KEY`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(issuer) = std::env::var(ISSUER_ENV) {
            tracing::debug!(issuer = %issuer, "Issuer overridden from environment");
            self.issuer = issuer;
        }
        if let Ok(key) = std::env::var(KEY_ENCRYPTION_KEY_ENV) {
            tracing::debug!("Key encryption key loaded from environment");
            self.key_encryption_key = key;
        }
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `issuer` is empty
    /// - any lifetime is zero
    /// - the access token outlives the refresh token
    /// - the RSA modulus is not 2048, 3072 or 4096
    /// - key retention is shorter than the access token lifetime
    ///
    /// Returns `ConfigError::Missing` if no master key is configured, and
    /// `InvalidValue` if it is not a base64 32-byte key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.audience.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue(
                "audience cannot be empty when set".to_string(),
            ));
        }

        let tokens = &self.tokens;
        for (name, lifetime) in [
            (
                "authorization_code_lifetime",
                tokens.authorization_code_lifetime,
            ),
            ("access_token_lifetime", tokens.access_token_lifetime),
            ("refresh_token_lifetime", tokens.refresh_token_lifetime),
        ] {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
        }

        if tokens.access_token_lifetime > tokens.refresh_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime cannot exceed refresh_token_lifetime".to_string(),
            ));
        }

        if !ALLOWED_RSA_BITS.contains(&self.signing.rsa_modulus_bits) {
            return Err(ConfigError::InvalidValue(format!(
                "rsa_modulus_bits must be one of {:?}, got {}",
                ALLOWED_RSA_BITS, self.signing.rsa_modulus_bits
            )));
        }

        if self.signing.key_retention < tokens.access_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "key_retention must be at least access_token_lifetime".to_string(),
            ));
        }

        if self.key_encryption_key.is_empty() {
            return Err(ConfigError::Missing(format!(
                "key_encryption_key (or {KEY_ENCRYPTION_KEY_ENV})"
            )));
        }

        PrivateKeyEncryptionService::new(&self.key_encryption_key)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(())
    }
}
