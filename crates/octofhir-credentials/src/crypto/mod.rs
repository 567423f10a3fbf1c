//! Cryptographic primitives backing the engine.
//!
//! - [`SecretEntropyValidator`] - client secret generation and scoring
//! - [`ClientSecretHasher`] - Argon2id hashing with timing-uniform failures
//! - [`PrivateKeyEncryptionService`] - AES-256-GCM protection of signing keys
//! - [`keygen`] - RSA/ECDSA key pair strategies
//! - [`jws`] - JWS signatures for all supported algorithms

pub mod encryption;
pub mod hasher;
pub mod jws;
pub mod keygen;
pub mod secret;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub use encryption::PrivateKeyEncryptionService;
pub use hasher::ClientSecretHasher;
pub use keygen::{
    EcdsaKeyGenerator, GeneratedKeyPair, KeyGenerator, KeyGeneratorRegistry, RsaKeyGenerator,
};
pub use secret::SecretEntropyValidator;

/// Hashes an opaque token or code with SHA-256, hex-encoded.
///
/// Repositories use this to store and look up codes and refresh tokens
/// without ever persisting plaintext.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a 256-bit random token encoded as base64url (43 characters).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares two strings without short-circuiting on the first mismatch.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
