//! Signing-key private material encryption at rest using AES-256-GCM.
//!
//! Blobs are `base64(nonce ‖ ciphertext ‖ tag)` with a fresh 96-bit nonce
//! per call.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::EncryptionError;

/// Master key size for AES-256-GCM (256 bits).
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-256-GCM (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

/// Encrypts and decrypts PEM private keys with a 32-byte master key.
#[derive(Clone)]
pub struct PrivateKeyEncryptionService {
    cipher: Aes256Gcm,
}

impl PrivateKeyEncryptionService {
    /// Creates the service from a base64-encoded 32-byte master key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMasterKey` if the key is not base64 or not 32 bytes.
    pub fn new(master_key_b64: &str) -> Result<Self, EncryptionError> {
        let key = Zeroizing::new(STANDARD.decode(master_key_b64.trim()).map_err(|e| {
            EncryptionError::InvalidMasterKey(format!("master key is not valid base64: {e}"))
        })?);

        if key.len() != KEY_SIZE {
            return Err(EncryptionError::InvalidMasterKey(format!(
                "master key must be {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| EncryptionError::InvalidMasterKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Generates a random master key, base64-encoded.
    #[must_use]
    pub fn generate_master_key() -> String {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut *key);
        STANDARD.encode(&*key)
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns `EncryptFailed` if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::EncryptFailed)?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Decrypts a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - `InvalidBase64` if the blob does not decode
    /// - `PayloadTooShort` if it cannot hold a nonce and a tag
    /// - `AuthenticationFailed` if the tag does not verify
    /// - `InvalidUtf8` if the plaintext is not UTF-8
    pub fn decrypt(&self, blob: &str) -> Result<Zeroizing<String>, EncryptionError> {
        let data = STANDARD
            .decode(blob.trim())
            .map_err(|_| EncryptionError::InvalidBase64)?;

        let min = NONCE_SIZE + TAG_SIZE;
        if data.len() < min {
            return Err(EncryptionError::PayloadTooShort {
                len: data.len(),
                min,
            });
        }

        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| EncryptionError::AuthenticationFailed)?,
        );

        std::str::from_utf8(&plaintext)
            .map(|s| Zeroizing::new(s.to_owned()))
            .map_err(|_| EncryptionError::InvalidUtf8)
    }
}

impl fmt::Debug for PrivateKeyEncryptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyEncryptionService { key: [REDACTED] }")
    }
}
