//! Refresh token domain types.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Revocation is one-way
//! - Every refresh revokes the presented row and creates a new one

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::scope::ScopeSet;

/// Refresh token stored by a [`RefreshTokenRepository`](crate::storage::RefreshTokenRepository).
///
/// The token itself is never stored. When validating a refresh token:
///
/// 1. Hash the incoming token
/// 2. Look up by hash
/// 3. Validate expiration and revocation status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hash of the actual token value.
    pub token_hash: String,

    /// Client ID that this token was issued to.
    pub client_id: String,

    /// User that authorized this token.
    pub user_id: String,

    /// Granted scopes.
    pub scopes: ScopeSet,

    /// Revocation flag. Only ever moves from `false` to `true`.
    pub is_revoked: bool,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RefreshToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < OffsetDateTime::now_utc()
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.is_revoked
    }

    /// A token is valid when it is neither revoked nor expired.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_revoked && !self.is_expired()
    }

    /// Marks the token revoked. Idempotent.
    pub fn revoke(&mut self) {
        self.is_revoked = true;
    }
}

/// Data for creating a refresh token; carries the plaintext value.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    /// Plaintext token.
    pub token: String,
    /// Client the token is bound to.
    pub client_id: String,
    /// Authorizing user.
    pub user_id: String,
    /// Granted scopes.
    pub scopes: ScopeSet,
    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

impl NewRefreshToken {
    /// Builds the stored record for this token given its hash.
    #[must_use]
    pub fn into_record(self, token_hash: String) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token_hash,
            client_id: self.client_id,
            user_id: self.user_id,
            scopes: self.scopes,
            is_revoked: false,
            expires_at: self.expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn create_test_token(expires_in: Duration) -> RefreshToken {
        NewRefreshToken {
            token: "plaintext".into(),
            client_id: "client".into(),
            user_id: "user-123".into(),
            scopes: ScopeSet::parse("read write").unwrap(),
            expires_at: OffsetDateTime::now_utc() + expires_in,
        }
        .into_record("hash".into())
    }

    #[test]
    fn test_new_token_is_valid() {
        let token = create_test_token(Duration::hours(1));
        assert!(!token.is_revoked());
        assert!(!token.is_expired());
        assert!(token.is_valid());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let token = create_test_token(Duration::seconds(-1));
        assert!(token.is_expired());
        assert!(!token.is_valid());
    }

    #[test]
    fn test_revoke_is_permanent() {
        let mut token = create_test_token(Duration::hours(1));
        token.revoke();
        assert!(token.is_revoked());
        assert!(!token.is_valid());

        token.revoke();
        assert!(token.is_revoked());
    }

    #[test]
    fn test_serialization() {
        let token = create_test_token(Duration::hours(1));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["tokenHash"], "hash");
        assert_eq!(json["isRevoked"], false);
        assert_eq!(json["scopes"], serde_json::json!(["read", "write"]));
    }
}
