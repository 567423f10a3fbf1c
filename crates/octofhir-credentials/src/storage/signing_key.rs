//! Signing key repository trait.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::{NewSigningKey, SigningKey};

/// Storage for JWS signing keys.
///
/// Private halves arrive already encrypted; implementations store them as
/// opaque strings.
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Returns active keys ordered newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_active_keys(&self) -> AuthResult<Vec<SigningKey>>;

    /// Returns every key not yet deleted, active or not, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_all(&self) -> AuthResult<Vec<SigningKey>>;

    /// Finds a key by `kid`, including deactivated keys still retained.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_kid(&self, kid: &str) -> AuthResult<Option<SigningKey>>;

    /// Stores a new, inactive key.
    ///
    /// # Errors
    ///
    /// Returns an error if the `kid` already exists or storage fails.
    async fn create(&self, key: NewSigningKey) -> AuthResult<SigningKey>;

    /// Marks a key active. Returns `false` if the `kid` is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn activate(&self, kid: &str) -> AuthResult<bool>;

    /// Marks a key inactive and records when it may be deleted. Returns
    /// `false` if the `kid` is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn deactivate(&self, kid: &str, retain_until: OffsetDateTime) -> AuthResult<bool>;

    /// Deletes inactive keys past their retention deadline and returns how
    /// many were removed. Active keys are never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_expired(&self) -> AuthResult<u64>;
}
