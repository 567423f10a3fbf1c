//! Revoked access token records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A blacklisted access token, keyed by its `jti`.
///
/// A verifier must reject any token whose `jti` has an entry, regardless of
/// the token's own `exp`. `expires_at` mirrors that `exp` so the entry can be
/// pruned once the token would be rejected anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBlacklistEntry {
    /// Record identifier.
    pub id: Uuid,

    /// JWT ID of the revoked token.
    pub jti: String,

    /// Expiry of the revoked token.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Revocation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub revoked_at: OffsetDateTime,

    /// Free-form revocation reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TokenBlacklistEntry {
    /// Creates an entry revoked now.
    #[must_use]
    pub fn new(jti: impl Into<String>, expires_at: OffsetDateTime, reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            jti: jti.into(),
            expires_at,
            revoked_at: OffsetDateTime::now_utc(),
            reason,
        }
    }

    /// Returns `true` once the underlying token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < OffsetDateTime::now_utc()
    }
}
