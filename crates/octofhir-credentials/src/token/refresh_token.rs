//! Refresh token lifecycle.
//!
//! Every use of a refresh token rotates it: the presented row is revoked and
//! a new row with a fresh value is created in one repository call. The new
//! row keeps the original absolute expiry, so rotation never extends a
//! session beyond its first grant.

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AuditEvent, AuditLogger};
use crate::crypto::generate_token;
use crate::error::AuthResult;
use crate::storage::RefreshTokenRepository;
use crate::token::expires_after;
use crate::types::{NewRefreshToken, RefreshToken, ScopeSet};

/// A refresh token together with its plaintext value.
#[derive(Clone)]
pub struct IssuedRefreshToken {
    /// Plaintext, returned to the client once.
    pub token: String,
    /// Stored record.
    pub record: RefreshToken,
}

impl std::fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("token", &"[REDACTED]")
            .field("record", &self.record)
            .finish()
    }
}

/// Creates, looks up, rotates and revokes refresh tokens.
pub struct RefreshTokenLifecycle {
    tokens: Arc<dyn RefreshTokenRepository>,
    lifetime: Duration,
    audit: Arc<dyn AuditLogger>,
}

impl RefreshTokenLifecycle {
    /// Creates the lifecycle.
    #[must_use]
    pub fn new(
        tokens: Arc<dyn RefreshTokenRepository>,
        lifetime: Duration,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            tokens,
            lifetime,
            audit,
        }
    }

    /// Issues a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn issue(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: ScopeSet,
    ) -> AuthResult<IssuedRefreshToken> {
        let token = generate_token();
        let record = self
            .tokens
            .create(NewRefreshToken {
                token: token.clone(),
                client_id: client_id.to_string(),
                user_id: user_id.to_string(),
                scopes,
                expires_at: expires_after(self.lifetime)?,
            })
            .await?;

        tracing::debug!(client_id, token_id = %record.id, "Issued refresh token");
        self.audit
            .log(AuditEvent::RefreshTokenIssued {
                user_id: record.user_id.clone(),
                client_id: record.client_id.clone(),
                token_id: record.id.to_string(),
            })
            .await;

        Ok(IssuedRefreshToken { token, record })
    }

    /// Looks up a token by plaintext value, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        self.tokens.find_by_token(token).await
    }

    /// Rotates `current` (whose plaintext is `token`) into a new token with
    /// the same scopes and absolute expiry.
    ///
    /// Returns `None` if another caller revoked or rotated the token first.
    ///
    /// # Errors
    ///
    /// Returns a storage error; no partial rotation is applied.
    pub async fn rotate(
        &self,
        token: &str,
        current: &RefreshToken,
    ) -> AuthResult<Option<IssuedRefreshToken>> {
        let replacement = generate_token();
        let rotated = self
            .tokens
            .rotate(
                token,
                NewRefreshToken {
                    token: replacement.clone(),
                    client_id: current.client_id.clone(),
                    user_id: current.user_id.clone(),
                    scopes: current.scopes.clone(),
                    expires_at: current.expires_at,
                },
            )
            .await?;

        let Some(record) = rotated else {
            return Ok(None);
        };

        tracing::debug!(
            client_id = %record.client_id,
            old_token_id = %current.id,
            new_token_id = %record.id,
            "Rotated refresh token"
        );
        self.audit
            .log(AuditEvent::RefreshTokenRotated {
                user_id: record.user_id.clone(),
                client_id: record.client_id.clone(),
                old_token_id: current.id.to_string(),
                new_token_id: record.id.to_string(),
            })
            .await;

        Ok(Some(IssuedRefreshToken {
            token: replacement,
            record,
        }))
    }

    /// Reports a revoked token being presented again.
    pub async fn report_reuse(&self, token: &RefreshToken) {
        tracing::warn!(
            client_id = %token.client_id,
            token_id = %token.id,
            "Revoked refresh token presented again; possible replay"
        );
        self.audit
            .log(AuditEvent::RefreshTokenReuseDetected {
                user_id: token.user_id.clone(),
                client_id: token.client_id.clone(),
                token_id: token.id.to_string(),
            })
            .await;
    }

    /// Revokes one token. Returns `true` if this call revoked it.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn revoke(&self, token: &str, record: &RefreshToken) -> AuthResult<bool> {
        let revoked = self.tokens.revoke(token).await?;
        if revoked {
            tracing::debug!(client_id = %record.client_id, token_id = %record.id, "Revoked refresh token");
            self.audit
                .log(AuditEvent::RefreshTokenRevoked {
                    user_id: record.user_id.clone(),
                    client_id: record.client_id.clone(),
                    token_id: record.id.to_string(),
                })
                .await;
        }
        Ok(revoked)
    }

    /// Active tokens of a user.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find_active_by_user(&self, user_id: &str) -> AuthResult<Vec<RefreshToken>> {
        self.tokens.find_active_by_user(user_id).await
    }

    /// Revokes every active token of a user.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> AuthResult<u64> {
        self.tokens.revoke_all_for_user(user_id).await
    }

    /// Deletes expired tokens.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        self.tokens.delete_expired().await
    }
}
