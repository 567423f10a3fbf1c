//! Authorization code repository trait.
//!
//! # Security Considerations
//!
//! - Codes are stored as SHA-256 hashes only
//! - Consumption must be a single atomic delete that reports whether a row
//!   was removed; application-level locking is not sufficient

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{AuthorizationCode, NewAuthorizationCode};

/// Storage for single-use authorization codes.
#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    /// Stores a new code. `code.code` is plaintext and must be hashed.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored (e.g. duplicate hash).
    async fn create(&self, code: NewAuthorizationCode) -> AuthResult<AuthorizationCode>;

    /// Finds a code by its plaintext value.
    ///
    /// Returns codes regardless of expiry; callers check `is_expired()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Atomically deletes the code.
    ///
    /// Returns `true` only for the single caller that removed the row. Every
    /// concurrent or later call for the same code returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str) -> AuthResult<bool>;

    /// Deletes expired codes and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self) -> AuthResult<u64>;
}
