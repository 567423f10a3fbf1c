//! Audit events for issuance and revocation.
//!
//! The engine reports security-relevant state changes to an [`AuditLogger`].
//! Storage and retention of the events belong to the sink.

use async_trait::async_trait;
use serde::Serialize;

/// Security-relevant events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// An access token was signed.
    AccessTokenIssued {
        /// Resource owner, absent for client credentials.
        user_id: Option<String>,
        /// Client the token was issued to.
        client_id: String,
        /// Token identifier.
        jti: String,
        /// Granted scopes.
        scopes: Vec<String>,
    },
    /// A refresh token was created.
    RefreshTokenIssued {
        /// Resource owner.
        user_id: String,
        /// Bound client.
        client_id: String,
        /// Refresh token record id.
        token_id: String,
    },
    /// A refresh token was exchanged for a new one.
    RefreshTokenRotated {
        /// Resource owner.
        user_id: String,
        /// Bound client.
        client_id: String,
        /// Revoked record id.
        old_token_id: String,
        /// New record id.
        new_token_id: String,
    },
    /// A refresh token was revoked outside rotation.
    RefreshTokenRevoked {
        /// Resource owner.
        user_id: String,
        /// Bound client.
        client_id: String,
        /// Revoked record id.
        token_id: String,
    },
    /// A revoked refresh token was presented again.
    RefreshTokenReuseDetected {
        /// Resource owner.
        user_id: String,
        /// Bound client.
        client_id: String,
        /// Reused record id.
        token_id: String,
    },
    /// An authorization code was created.
    AuthorizationCodeIssued {
        /// Resource owner.
        user_id: String,
        /// Client the code was issued to.
        client_id: String,
    },
    /// An authorization code was exchanged.
    AuthorizationCodeConsumed {
        /// Resource owner.
        user_id: String,
        /// Client that redeemed the code.
        client_id: String,
    },
    /// An access token `jti` was blacklisted.
    AccessTokenRevoked {
        /// Token identifier.
        jti: String,
        /// Revocation reason.
        reason: Option<String>,
    },
    /// Client authentication failed.
    ClientAuthenticationFailed {
        /// Presented client identifier, when one could be parsed.
        client_id: Option<String>,
    },
    /// A user's refresh tokens were revoked on logout.
    UserLoggedOut {
        /// Resource owner.
        user_id: String,
        /// Number of refresh tokens revoked.
        revoked_refresh_tokens: u64,
    },
    /// A signing key was generated.
    SigningKeyCreated {
        /// Key identifier.
        kid: String,
        /// Key algorithm.
        algorithm: String,
    },
    /// A signing key became eligible for new signatures.
    SigningKeyActivated {
        /// Key identifier.
        kid: String,
    },
    /// A signing key stopped signing and entered retention.
    SigningKeyDeactivated {
        /// Key identifier.
        kid: String,
    },
    /// Retained keys past their deadline were deleted.
    SigningKeysPurged {
        /// Number of keys removed.
        count: u64,
    },
}

impl AuditEvent {
    /// Short machine name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccessTokenIssued { .. } => "access_token_issued",
            Self::RefreshTokenIssued { .. } => "refresh_token_issued",
            Self::RefreshTokenRotated { .. } => "refresh_token_rotated",
            Self::RefreshTokenRevoked { .. } => "refresh_token_revoked",
            Self::RefreshTokenReuseDetected { .. } => "refresh_token_reuse_detected",
            Self::AuthorizationCodeIssued { .. } => "authorization_code_issued",
            Self::AuthorizationCodeConsumed { .. } => "authorization_code_consumed",
            Self::AccessTokenRevoked { .. } => "access_token_revoked",
            Self::ClientAuthenticationFailed { .. } => "client_authentication_failed",
            Self::UserLoggedOut { .. } => "user_logged_out",
            Self::SigningKeyCreated { .. } => "signing_key_created",
            Self::SigningKeyActivated { .. } => "signing_key_activated",
            Self::SigningKeyDeactivated { .. } => "signing_key_deactivated",
            Self::SigningKeysPurged { .. } => "signing_keys_purged",
        }
    }
}

/// Sink for audit events.
///
/// Logging must not fail issuance, so `log` has no error channel.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records an event.
    async fn log(&self, event: AuditEvent);
}

/// Writes audit events as structured `tracing` records on target
/// `octofhir::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(target: "octofhir::audit", event = event.name(), %payload, "Audit event");
            }
            Err(e) => {
                tracing::warn!(target: "octofhir::audit", event = event.name(), error = %e, "Failed to serialize audit event");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::AccessTokenIssued {
            user_id: Some("user-123".into()),
            client_id: "client-456".into(),
            jti: "abc".into(),
            scopes: vec!["read".into(), "write".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "access_token_issued");
        assert_eq!(json["client_id"], "client-456");
        assert_eq!(json["scopes"][1], "write");
        assert_eq!(event.name(), "access_token_issued");
    }

    #[tokio::test]
    async fn test_loggers_accept_events() {
        let event = AuditEvent::SigningKeysPurged { count: 2 };
        TracingAuditLogger.log(event.clone()).await;
        NoopAuditLogger.log(event).await;
    }
}
