//! `refresh_token` grant (RFC 6749 §6) with rotation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::{GrantContext, GrantHandler, narrow_scopes, required_param};
use crate::error::{AuthError, AuthResult};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::token::RefreshTokenLifecycle;
use crate::types::GrantType;

/// Exchanges a refresh token for a new access token and a rotated refresh
/// token.
pub struct RefreshTokenGrantHandler {
    context: Arc<GrantContext>,
    refresh_tokens: Arc<RefreshTokenLifecycle>,
}

impl RefreshTokenGrantHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(context: Arc<GrantContext>, refresh_tokens: Arc<RefreshTokenLifecycle>) -> Self {
        Self {
            context,
            refresh_tokens,
        }
    }
}

#[async_trait]
impl GrantHandler for RefreshTokenGrantHandler {
    fn grant_type(&self) -> GrantType {
        GrantType::RefreshToken
    }

    #[instrument(skip_all, fields(grant_type = "refresh_token"))]
    async fn handle(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let token = required_param(request.refresh_token.as_deref(), "refresh_token")?;

        let client = self
            .context
            .authenticate(request, GrantType::RefreshToken)
            .await?;

        let record = self
            .refresh_tokens
            .find(token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if record.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                token_id = %record.id,
                "Refresh token presented by another client"
            );
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }
        if record.is_revoked() {
            self.refresh_tokens.report_reuse(&record).await;
            return Err(AuthError::invalid_grant("Refresh token has been revoked"));
        }
        if record.is_expired() {
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        // Narrowing applies to this access token only; the rotated refresh
        // token keeps the original grant.
        let scopes = narrow_scopes(request.scope.as_deref(), &record.scopes)?;

        let Some(rotated) = self
            .refresh_tokens
            .rotate(token, &record)
            .await?
        else {
            self.refresh_tokens.report_reuse(&record).await;
            return Err(AuthError::invalid_grant("Refresh token has been revoked"));
        };

        let access_token = self
            .context
            .issue_access_token(&client, &record.user_id, Some(&record.user_id), &scopes)
            .await?;

        Ok(
            TokenResponse::new(access_token.token.clone(), access_token.expires_in())
                .with_refresh_token(rotated.token)
                .with_scope(scopes.to_string()),
        )
    }
}
