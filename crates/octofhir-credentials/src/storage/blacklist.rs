//! Access token blacklist repository trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::TokenBlacklistEntry;

/// Storage for revoked access token `jti` values.
///
/// Lookups by `jti` sit on the verification path and should be an indexed
/// point query.
#[async_trait]
pub trait TokenBlacklistRepository: Send + Sync {
    /// Records a revocation. Adding an already present `jti` is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn add(&self, entry: &TokenBlacklistEntry) -> AuthResult<()>;

    /// Returns `true` if the `jti` has been revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_blacklisted(&self, jti: &str) -> AuthResult<bool>;

    /// Deletes entries whose token has expired and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self) -> AuthResult<u64>;
}
