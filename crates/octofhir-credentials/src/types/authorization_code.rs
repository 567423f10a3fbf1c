//! Authorization code domain types.
//!
//! Codes are short-lived and single-use. The plaintext code is handed to
//! the client once; repositories persist only its SHA-256 hash.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::scope::ScopeSet;

/// A stored authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Record identifier.
    pub id: Uuid,

    /// SHA-256 hash of the code.
    pub code_hash: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Resource owner who approved the request.
    pub user_id: String,

    /// Redirect URI presented at the authorization step.
    pub redirect_uri: String,

    /// Approved scopes.
    pub scopes: ScopeSet,

    /// PKCE challenge, when the client sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method (`plain` or `S256`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Expiry instant.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` once `expires_at` is in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Expiry check against an explicit instant.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }

    /// Returns `true` if a PKCE challenge was registered with the code.
    #[must_use]
    pub fn has_pkce(&self) -> bool {
        self.code_challenge.is_some()
    }
}

/// Data for creating an authorization code.
///
/// Carries the plaintext `code`; the repository hashes it before storage.
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    /// Plaintext code.
    pub code: String,
    /// Client the code is issued to.
    pub client_id: String,
    /// Approving resource owner.
    pub user_id: String,
    /// Redirect URI from the authorization request.
    pub redirect_uri: String,
    /// Approved scopes.
    pub scopes: ScopeSet,
    /// PKCE challenge.
    pub code_challenge: Option<String>,
    /// PKCE method.
    pub code_challenge_method: Option<String>,
    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

impl NewAuthorizationCode {
    /// Builds the stored record for this code given its hash.
    #[must_use]
    pub fn into_record(self, code_hash: String) -> AuthorizationCode {
        AuthorizationCode {
            id: Uuid::new_v4(),
            code_hash,
            client_id: self.client_id,
            user_id: self.user_id,
            redirect_uri: self.redirect_uri,
            scopes: self.scopes,
            code_challenge: self.code_challenge,
            code_challenge_method: self.code_challenge_method,
            expires_at: self.expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
