//! Grant type handlers and their dispatcher.
//!
//! The dispatcher holds an ordered list of handlers assembled once at
//! startup and routes each request to the first handler whose
//! [`GrantHandler::supports`] accepts its `grant_type`.

pub mod authorization_code;
pub mod client_credentials;
pub mod refresh_token;

use std::sync::Arc;

use async_trait::async_trait;

use crate::audit::{AuditEvent, AuditLogger};
use crate::error::{AuthError, AuthResult};
use crate::oauth::client_auth::ClientAuthenticator;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::token::{AccessTokenPayload, IssuedToken, JwtIssuer};
use crate::types::{Client, GrantType, ScopeSet};

pub use authorization_code::AuthorizationCodeGrantHandler;
pub use client_credentials::ClientCredentialsGrantHandler;
pub use refresh_token::RefreshTokenGrantHandler;

/// A token endpoint grant type.
#[async_trait]
pub trait GrantHandler: Send + Sync {
    /// The grant type this handler serves.
    fn grant_type(&self) -> GrantType;

    /// Returns `true` if this handler serves `grant_type`.
    fn supports(&self, grant_type: &str) -> bool {
        grant_type == self.grant_type().as_str()
    }

    /// Processes a token request.
    ///
    /// # Errors
    ///
    /// Returns the OAuth 2.0 error for the failure.
    async fn handle(&self, request: &TokenRequest) -> AuthResult<TokenResponse>;
}

/// Routes token requests to grant handlers.
#[derive(Default)]
pub struct GrantHandlerDispatcher {
    handlers: Vec<Box<dyn GrantHandler>>,
}

impl GrantHandlerDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    #[must_use]
    pub fn with(mut self, handler: impl GrantHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Grant types served, in dispatch order.
    #[must_use]
    pub fn grant_types(&self) -> Vec<GrantType> {
        self.handlers.iter().map(|h| h.grant_type()).collect()
    }

    /// Dispatches `request` to the first supporting handler.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `grant_type` is missing
    /// - `UnsupportedGrantType` if no handler supports it
    /// - whatever the selected handler returns
    pub async fn dispatch(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let grant_type = request
            .grant_type
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing grant_type parameter"))?;

        let handler = self
            .handlers
            .iter()
            .find(|h| h.supports(grant_type))
            .ok_or_else(|| {
                tracing::debug!(grant_type, "No handler for grant type");
                AuthError::unsupported_grant_type(grant_type)
            })?;

        handler.handle(request).await
    }
}

/// Collaborators shared by every grant handler.
pub struct GrantContext {
    authenticator: ClientAuthenticator,
    issuer: JwtIssuer,
    audience: Option<String>,
    access_token_lifetime: i64,
    audit: Arc<dyn AuditLogger>,
}

impl GrantContext {
    /// Creates the context.
    ///
    /// `audience` overrides the default `aud` of the client ID.
    #[must_use]
    pub fn new(
        authenticator: ClientAuthenticator,
        issuer: JwtIssuer,
        audience: Option<String>,
        access_token_lifetime: i64,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            authenticator,
            issuer,
            audience,
            access_token_lifetime,
            audit,
        }
    }

    /// Authenticates the client and checks it may use `grant_type`.
    ///
    /// # Errors
    ///
    /// `InvalidClient` from authentication, or `UnauthorizedClient`.
    pub async fn authenticate(
        &self,
        request: &TokenRequest,
        grant_type: GrantType,
    ) -> AuthResult<Client> {
        let client = self.authenticator.authenticate(request).await?.client;
        if !client.is_grant_type_allowed(grant_type) {
            tracing::warn!(client_id = %client.client_id, %grant_type, "Client used an unregistered grant type");
            return Err(AuthError::unauthorized_client(format!(
                "client is not registered for the {grant_type} grant"
            )));
        }
        Ok(client)
    }

    /// Signs an access token for `client` and audits it.
    ///
    /// # Errors
    ///
    /// Propagates payload validation and signing failures.
    pub async fn issue_access_token(
        &self,
        client: &Client,
        subject: &str,
        user_id: Option<&str>,
        scopes: &ScopeSet,
    ) -> AuthResult<IssuedToken> {
        let audience = self.audience.as_deref().unwrap_or(&client.client_id);
        let payload = AccessTokenPayload::new(
            subject,
            audience,
            scopes.to_string(),
            self.access_token_lifetime,
        )?
        .with_client_id(client.client_id.clone());

        let issued = self.issuer.generate(&payload).await?;

        self.audit
            .log(AuditEvent::AccessTokenIssued {
                user_id: user_id.map(str::to_string),
                client_id: client.client_id.clone(),
                jti: issued.claims.jti.clone(),
                scopes: scopes.to_vec(),
            })
            .await;

        Ok(issued)
    }
}

/// Returns a non-blank parameter or `InvalidRequest`.
pub(crate) fn required_param<'a>(value: Option<&'a str>, name: &str) -> AuthResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::invalid_request(format!("Missing {name} parameter")))
}

/// Resolves a requested scope against what may be granted.
///
/// An omitted or blank scope grants everything in `allowed`; a requested
/// scope must be a subset of it.
pub(crate) fn narrow_scopes(requested: Option<&str>, allowed: &ScopeSet) -> AuthResult<ScopeSet> {
    let Some(requested) = requested.filter(|s| !s.trim().is_empty()) else {
        return Ok(allowed.clone());
    };

    let requested = ScopeSet::parse(requested)?;
    if !requested.is_subset(allowed) {
        let extra = requested.difference(allowed);
        return Err(AuthError::invalid_scope(format!(
            "requested scope exceeds the grant: {extra}"
        )));
    }
    Ok(requested)
}
