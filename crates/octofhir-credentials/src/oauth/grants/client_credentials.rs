//! `client_credentials` grant (RFC 6749 §4.4).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::{GrantContext, GrantHandler, narrow_scopes};
use crate::error::{AuthError, AuthResult};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::types::GrantType;

/// Issues access tokens to confidential clients acting on their own behalf.
///
/// The token subject is the client ID. No refresh token is issued.
pub struct ClientCredentialsGrantHandler {
    context: Arc<GrantContext>,
}

impl ClientCredentialsGrantHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(context: Arc<GrantContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl GrantHandler for ClientCredentialsGrantHandler {
    fn grant_type(&self) -> GrantType {
        GrantType::ClientCredentials
    }

    #[instrument(skip_all, fields(grant_type = "client_credentials"))]
    async fn handle(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let client = self
            .context
            .authenticate(request, GrantType::ClientCredentials)
            .await?;

        if !client.confidential {
            return Err(AuthError::unauthorized_client(
                "Public clients cannot use the client_credentials grant",
            ));
        }

        let scopes = narrow_scopes(request.scope.as_deref(), &client.scopes)?;
        if scopes.is_empty() {
            return Err(AuthError::invalid_scope("No scopes are available to this client"));
        }

        let access_token = self
            .context
            .issue_access_token(&client, &client.client_id, None, &scopes)
            .await?;

        Ok(
            TokenResponse::new(access_token.token.clone(), access_token.expires_in())
                .with_scope(scopes.to_string()),
        )
    }
}
