//! Access token blacklist.
//!
//! Revoked access tokens are recorded by `jti`. Entries expire together with
//! the token they revoke, since an expired token is rejected by its own
//! `exp` claim anyway.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::audit::{AuditEvent, AuditLogger};
use crate::error::{AuthError, AuthResult};
use crate::storage::TokenBlacklistRepository;
use crate::types::TokenBlacklistEntry;

/// Records and queries revoked token identifiers.
pub struct TokenBlacklist {
    entries: Arc<dyn TokenBlacklistRepository>,
    audit: Arc<dyn AuditLogger>,
}

impl TokenBlacklist {
    /// Creates the blacklist.
    #[must_use]
    pub fn new(entries: Arc<dyn TokenBlacklistRepository>, audit: Arc<dyn AuditLogger>) -> Self {
        Self { entries, audit }
    }

    /// Blacklists `jti` until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty `jti`, or a storage error.
    pub async fn revoke(
        &self,
        jti: &str,
        expires_at: OffsetDateTime,
        reason: Option<String>,
    ) -> AuthResult<()> {
        if jti.is_empty() {
            return Err(AuthError::invalid_argument("jti must not be empty"));
        }

        let entry = TokenBlacklistEntry::new(jti, expires_at, reason);
        self.entries.add(&entry).await?;

        tracing::debug!(jti, "Blacklisted access token");
        self.audit
            .log(AuditEvent::AccessTokenRevoked {
                jti: entry.jti,
                reason: entry.reason,
            })
            .await;
        Ok(())
    }

    /// Returns `true` if `jti` is blacklisted.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn is_blacklisted(&self, jti: &str) -> AuthResult<bool> {
        self.entries.is_blacklisted(jti).await
    }

    /// Deletes entries whose token has expired.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn delete_expired(&self) -> AuthResult<u64> {
        self.entries.delete_expired().await
    }
}
