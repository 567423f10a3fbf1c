//! Client authentication for the token endpoint.
//!
//! # Authentication Methods
//!
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//! - `none` - Public clients (client_id only)
//!
//! # Authentication Priority
//!
//! When several are present they are tried in order:
//! 1. HTTP Basic Auth header
//! 2. client_secret_post (body parameters)
//! 3. Public client (client_id only)
//!
//! A request that combines Basic Auth with a body `client_secret` uses two
//! methods at once and is rejected (RFC 6749 Section 2.3).
//!
//! # Failure Uniformity
//!
//! Every failure returns the same `invalid_client` error. Unknown clients and
//! clients that cannot hold a secret still pay for one Argon2 verification
//! against a reference hash, so latency does not reveal whether a
//! `client_id` exists.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditLogger};
use crate::crypto::ClientSecretHasher;
use crate::error::{AuthError, AuthResult};
use crate::oauth::token::TokenRequest;
use crate::storage::ClientRepository;
use crate::types::Client;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Token endpoint authentication methods.
///
/// Defined in OpenID Connect Core Section 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolves and authenticates the client behind a token request.
pub struct ClientAuthenticator {
    clients: Arc<dyn ClientRepository>,
    hasher: Arc<ClientSecretHasher>,
    audit: Arc<dyn AuditLogger>,
}

impl ClientAuthenticator {
    /// Creates an authenticator.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        hasher: Arc<ClientSecretHasher>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            clients,
            hasher,
            audit,
        }
    }

    /// Authenticates the client presenting `request`.
    ///
    /// # Errors
    ///
    /// Returns the uniform `InvalidClient` error when no credentials are
    /// present, the Basic header is malformed, the client is unknown or
    /// inactive, the secret does not verify, a public client presents a
    /// secret, a confidential client uses the public path, or Basic Auth is
    /// combined with a body secret. Storage failures propagate unchanged.
    pub async fn authenticate(&self, request: &TokenRequest) -> AuthResult<AuthenticatedClient> {
        if let Some(header) = request.authorization.as_deref() {
            let Some((client_id, client_secret)) = parse_basic_auth(header) else {
                return Err(self.reject(None, "malformed Basic authorization header").await);
            };
            if let Some(body_id) = request.client_id.as_deref()
                && body_id != client_id
            {
                return Err(self
                    .reject(Some(client_id), "client_id in body differs from Basic credentials")
                    .await);
            }
            if request.client_secret.is_some() {
                return Err(self
                    .reject(Some(client_id), "client_secret in body alongside Basic credentials")
                    .await);
            }
            return self
                .authenticate_with_secret(
                    client_id,
                    &client_secret,
                    TokenEndpointAuthMethod::ClientSecretBasic,
                )
                .await;
        }

        match (request.client_id.as_deref(), request.client_secret.as_deref()) {
            (Some(client_id), Some(client_secret)) => {
                self.authenticate_with_secret(
                    client_id.to_string(),
                    client_secret,
                    TokenEndpointAuthMethod::ClientSecretPost,
                )
                .await
            }
            (Some(client_id), None) => self.authenticate_public(client_id.to_string()).await,
            (None, _) => Err(self.reject(None, "no client credentials presented").await),
        }
    }

    async fn authenticate_with_secret(
        &self,
        client_id: String,
        client_secret: &str,
        method: TokenEndpointAuthMethod,
    ) -> AuthResult<AuthenticatedClient> {
        let client = self.clients.find_by_public_id(&client_id).await?;

        let reason = match client {
            Some(client) if client.active && client.confidential => {
                let verified = match client.secret_hash.as_deref() {
                    Some(hash) => self.hasher.verify_client_secret(client_secret, hash),
                    None => {
                        self.hasher.dummy_verify(client_secret);
                        false
                    }
                };
                if verified {
                    tracing::debug!(client_id = %client.client_id, auth_method = %method, "Client authenticated");
                    return Ok(AuthenticatedClient {
                        client,
                        auth_method: method,
                    });
                }
                "secret mismatch"
            }
            Some(client) => {
                self.hasher.dummy_verify(client_secret);
                if client.active {
                    "public client presented a secret"
                } else {
                    "client is inactive"
                }
            }
            None => {
                self.hasher.dummy_verify(client_secret);
                "unknown client"
            }
        };

        Err(self.reject(Some(client_id), reason).await)
    }

    async fn authenticate_public(&self, client_id: String) -> AuthResult<AuthenticatedClient> {
        let client = self.clients.find_by_public_id(&client_id).await?;

        let reason = match client {
            Some(client) if client.active && !client.confidential => {
                tracing::debug!(client_id = %client.client_id, "Public client identified");
                return Ok(AuthenticatedClient {
                    client,
                    auth_method: TokenEndpointAuthMethod::None,
                });
            }
            Some(client) if client.confidential => {
                "confidential client cannot authenticate as public"
            }
            Some(_) => "client is inactive",
            None => "unknown client",
        };

        Err(self.reject(Some(client_id), reason).await)
    }

    /// Logs and audits a failure, then returns the uniform error.
    async fn reject(&self, client_id: Option<String>, reason: &'static str) -> AuthError {
        tracing::warn!(
            client_id = client_id.as_deref().unwrap_or("-"),
            reason,
            "Client authentication failed"
        );
        self.audit
            .log(AuditEvent::ClientAuthenticationFailed { client_id })
            .await;
        AuthError::invalid_client()
    }
}

/// Parses an HTTP Basic `Authorization` header.
///
/// Splits on the first colon, so secrets may contain colons. Returns `None`
/// for a missing `Basic ` prefix, bad base64, non-UTF-8 content, a missing
/// colon, or an empty client ID.
///
/// # Example
///
/// ```
/// use octofhir_credentials::oauth::parse_basic_auth;
///
/// let parsed = parse_basic_auth("Basic Y2xpZW50OnNlYzpyZXQ=");
/// assert_eq!(parsed, Some(("client".to_string(), "sec:ret".to_string())));
/// ```
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (client_id, client_secret) = credentials.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }

    Some((client_id.to_string(), client_secret.to_string()))
}
