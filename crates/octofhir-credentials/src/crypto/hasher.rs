//! Argon2id hashing of client secrets.
//!
//! # Security
//!
//! - Hashing uses Argon2id with configurable cost parameters
//! - Salts are generated using OsRng
//! - Verification compares digests in constant time
//! - Unknown clients are verified against a reference hash of equal cost so
//!   both failure paths take the same time

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AuthError, AuthResult};

/// Input hashed into the reference hash used for dummy verification.
const REFERENCE_SECRET: &[u8] = b"octofhir-credentials/reference-client-secret";

/// Hashes and verifies client secrets.
#[derive(Clone)]
pub struct ClientSecretHasher {
    argon2: Argon2<'static>,
    reference_hash: String,
}

impl ClientSecretHasher {
    /// Creates a hasher with the Argon2 default parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference hash cannot be computed.
    pub fn new() -> AuthResult<Self> {
        Self::with_params(Params::default())
    }

    /// Creates a hasher with explicit Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference hash cannot be computed.
    pub fn with_params(params: Params) -> AuthResult<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let reference_hash = hash_with(&argon2, REFERENCE_SECRET)?;
        Ok(Self {
            argon2,
            reference_hash,
        })
    }

    /// Hashes a secret into a PHC string for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        hash_with(&self.argon2, secret.as_bytes())
    }

    /// Verifies a secret against a stored PHC hash.
    ///
    /// Returns `false` for mismatches and for unparseable hashes. An
    /// unparseable stored hash still costs one reference verification.
    #[must_use]
    pub fn verify_client_secret(&self, secret: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                tracing::warn!("Stored client secret hash is not a valid PHC string");
                self.dummy_verify(secret);
                false
            }
        }
    }

    /// Verifies `secret` against the reference hash and discards the result.
    pub fn dummy_verify(&self, secret: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.reference_hash) {
            let _ = self.argon2.verify_password(secret.as_bytes(), &parsed);
        }
    }
}

fn hash_with(argon2: &Argon2<'static>, secret: &[u8]) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("Failed to hash client secret: {e}")))
}

impl fmt::Debug for ClientSecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretHasher")
            .field("reference_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> ClientSecretHasher {
        ClientSecretHasher::with_params(Params::new(1024, 1, 1, None).unwrap()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("s3cret-value").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_client_secret("s3cret-value", &hash));
        assert!(!hasher.verify_client_secret("wrong", &hash));
    }

    #[test]
    fn test_hash_uses_unique_salt() {
        let hasher = fast_hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_invalid_hash_returns_false() {
        let hasher = fast_hasher();
        assert!(!hasher.verify_client_secret("secret", "not-a-phc-string"));
    }

    #[test]
    fn test_dummy_verify_does_not_panic() {
        fast_hasher().dummy_verify("anything");
    }

    #[test]
    fn test_debug_redacts() {
        let debug = format!("{:?}", fast_hasher());
        assert!(!debug.contains("$argon2id$"));
    }
}
