//! Refresh token repository trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Revocation must be atomic and immediate
//! - Rotation revokes the old row and creates the new one in a single unit
//! - Expired tokens should be cleaned up periodically

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{NewRefreshToken, RefreshToken};

/// Storage trait for refresh tokens.
///
/// # Example Implementation
///
/// ```ignore
/// use octofhir_credentials::crypto::hash_token;
/// use octofhir_credentials::storage::RefreshTokenRepository;
/// use octofhir_credentials::types::{NewRefreshToken, RefreshToken};
///
/// struct InMemoryRefreshTokens {
///     tokens: tokio::sync::RwLock<std::collections::HashMap<String, RefreshToken>>,
/// }
///
/// #[async_trait::async_trait]
/// impl RefreshTokenRepository for InMemoryRefreshTokens {
///     async fn create(&self, token: NewRefreshToken) -> AuthResult<RefreshToken> {
///         let hash = hash_token(&token.token);
///         let record = token.into_record(hash.clone());
///         self.tokens.write().await.insert(hash, record.clone());
///         Ok(record)
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Stores a new refresh token. `token.token` is plaintext.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored (e.g., duplicate hash,
    /// storage unavailable).
    async fn create(&self, token: NewRefreshToken) -> AuthResult<RefreshToken>;

    /// Finds a refresh token by its plaintext value.
    ///
    /// This returns tokens regardless of expiration/revocation status;
    /// callers should check `is_valid()` before using.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes a refresh token.
    ///
    /// Returns `true` if this call moved the token from active to revoked,
    /// `false` if it was unknown or already revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke(&self, token: &str) -> AuthResult<bool>;

    /// Revokes `old_token` and stores `replacement` as one atomic unit.
    ///
    /// Returns `None` without writing anything if `old_token` is unknown or
    /// already revoked, so at most one of several concurrent rotations of
    /// the same token succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails; in that case neither write
    /// is applied.
    async fn rotate(
        &self,
        old_token: &str,
        replacement: NewRefreshToken,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Returns the user's tokens that are neither revoked nor expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_active_by_user(&self, user_id: &str) -> AuthResult<Vec<RefreshToken>>;

    /// Revokes every active token of a user and returns how many changed.
    ///
    /// Used on logout and account compromise.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<u64>;

    /// Deletes expired tokens and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn delete_expired(&self) -> AuthResult<u64>;
}
