//! `authorization_code` grant (RFC 6749 §4.1.3, RFC 7636 §4.5).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::{GrantContext, GrantHandler, required_param};
use crate::error::{AuthError, AuthResult};
use crate::oauth::pkce::PkceValidator;
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::token::{AuthorizationCodeLifecycle, RefreshTokenLifecycle};
use crate::types::{AuthorizationCode, Client, GrantType};

/// Exchanges an authorization code for an access and refresh token.
pub struct AuthorizationCodeGrantHandler {
    context: Arc<GrantContext>,
    codes: Arc<AuthorizationCodeLifecycle>,
    refresh_tokens: Arc<RefreshTokenLifecycle>,
    pkce: PkceValidator,
    require_pkce_for_public_clients: bool,
}

impl AuthorizationCodeGrantHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        context: Arc<GrantContext>,
        codes: Arc<AuthorizationCodeLifecycle>,
        refresh_tokens: Arc<RefreshTokenLifecycle>,
        pkce: PkceValidator,
        require_pkce_for_public_clients: bool,
    ) -> Self {
        Self {
            context,
            codes,
            refresh_tokens,
            pkce,
            require_pkce_for_public_clients,
        }
    }

    fn verify_pkce(
        &self,
        client: &Client,
        code: &AuthorizationCode,
        verifier: Option<&str>,
    ) -> AuthResult<()> {
        let Some(challenge) = code.code_challenge.as_deref() else {
            if client.requires_pkce(self.require_pkce_for_public_clients) {
                tracing::warn!(client_id = %client.client_id, "Code without PKCE challenge for a PKCE client");
                return Err(AuthError::invalid_grant(
                    "PKCE is required for this client",
                ));
            }
            if verifier.is_some() {
                return Err(AuthError::invalid_grant(
                    "code_verifier sent for a code issued without code_challenge",
                ));
            }
            return Ok(());
        };

        let verifier = required_param(verifier, "code_verifier")?;
        if !PkceValidator::is_well_formed_verifier(verifier) {
            return Err(AuthError::invalid_grant("malformed code_verifier"));
        }

        let method = code.code_challenge_method.as_deref().unwrap_or("plain");
        if !self.pkce.validate(verifier, challenge, method) {
            tracing::warn!(client_id = %client.client_id, code_id = %code.id, "PKCE verification failed");
            return Err(AuthError::invalid_grant("PKCE verification failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl GrantHandler for AuthorizationCodeGrantHandler {
    fn grant_type(&self) -> GrantType {
        GrantType::AuthorizationCode
    }

    #[instrument(skip_all, fields(grant_type = "authorization_code"))]
    async fn handle(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let code = required_param(request.code.as_deref(), "code")?;
        let redirect_uri = required_param(request.redirect_uri.as_deref(), "redirect_uri")?;

        let client = self
            .context
            .authenticate(request, GrantType::AuthorizationCode)
            .await?;

        let record = self
            .codes
            .find(code)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid authorization code"))?;

        if record.is_expired() {
            return Err(AuthError::invalid_grant("Authorization code expired"));
        }
        if record.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                code_id = %record.id,
                "Authorization code presented by another client"
            );
            return Err(AuthError::invalid_grant("Invalid authorization code"));
        }
        if record.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri mismatch"));
        }

        self.verify_pkce(&client, &record, request.code_verifier.as_deref())?;

        if !self.codes.consume(&record, code).await? {
            return Err(AuthError::invalid_grant(
                "Authorization code has already been used",
            ));
        }

        let access_token = self
            .context
            .issue_access_token(&client, &record.user_id, Some(&record.user_id), &record.scopes)
            .await?;

        let mut response = TokenResponse::new(access_token.token.clone(), access_token.expires_in())
            .with_scope(record.scopes.to_string());

        if client.is_grant_type_allowed(GrantType::RefreshToken) {
            let refresh = self
                .refresh_tokens
                .issue(&client.client_id, &record.user_id, record.scopes.clone())
                .await?;
            response = response.with_refresh_token(refresh.token);
        }

        tracing::debug!(client_id = %client.client_id, jti = %access_token.jti(), "Exchanged authorization code");
        Ok(response)
    }
}
