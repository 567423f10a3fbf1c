//! Authorization code lifecycle.
//!
//! Codes are issued at the authorization step, exchanged exactly once at the
//! token endpoint, or swept after expiry. The plaintext code leaves this
//! module only as the return value of [`AuthorizationCodeLifecycle::issue`].

use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AuditEvent, AuditLogger};
use crate::crypto::generate_token;
use crate::error::{AuthError, AuthResult};
use crate::oauth::pkce::{PkceMethod, PkceValidator};
use crate::storage::AuthorizationCodeRepository;
use crate::token::expires_after;
use crate::types::{AuthorizationCode, Client, GrantType, NewAuthorizationCode, ScopeSet};

/// Parameters of an approved authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRequest {
    /// Approving resource owner.
    pub user_id: String,
    /// Redirect URI from the authorization request.
    pub redirect_uri: String,
    /// Approved scopes.
    pub scopes: ScopeSet,
    /// PKCE challenge.
    pub code_challenge: Option<String>,
    /// PKCE method. Defaults to `plain` when a challenge is present.
    pub code_challenge_method: Option<String>,
}

/// Creates, looks up, consumes and sweeps authorization codes.
pub struct AuthorizationCodeLifecycle {
    codes: Arc<dyn AuthorizationCodeRepository>,
    lifetime: Duration,
    pkce: PkceValidator,
    require_pkce_for_public_clients: bool,
    audit: Arc<dyn AuditLogger>,
}

impl AuthorizationCodeLifecycle {
    /// Creates the lifecycle.
    #[must_use]
    pub fn new(
        codes: Arc<dyn AuthorizationCodeRepository>,
        lifetime: Duration,
        pkce: PkceValidator,
        require_pkce_for_public_clients: bool,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            codes,
            lifetime,
            pkce,
            require_pkce_for_public_clients,
            audit,
        }
    }

    /// Issues a code for `client` and returns the plaintext once.
    ///
    /// # Errors
    ///
    /// - `UnauthorizedClient` if the client may not use the code grant
    /// - `InvalidRequest` for an unregistered redirect URI, a blank user, a
    ///   missing challenge when PKCE is required, a malformed challenge, or
    ///   an unsupported or disabled challenge method
    /// - `InvalidScope` for an empty scope set or scopes the client may not
    ///   request
    pub async fn issue(
        &self,
        client: &Client,
        request: AuthorizationCodeRequest,
    ) -> AuthResult<String> {
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "client is not registered for the authorization_code grant",
            ));
        }
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::invalid_request("redirect_uri is not registered"));
        }
        if request.user_id.trim().is_empty() {
            return Err(AuthError::invalid_request("user_id must not be empty"));
        }
        if request.scopes.is_empty() {
            return Err(AuthError::invalid_scope("at least one scope is required"));
        }
        if !request.scopes.is_subset(&client.scopes) {
            let extra = request.scopes.difference(&client.scopes);
            return Err(AuthError::invalid_scope(format!(
                "scopes not allowed for client: {extra}"
            )));
        }

        let code_challenge_method = self.check_challenge(client, &request)?;

        let code = generate_token();
        let record = self
            .codes
            .create(NewAuthorizationCode {
                code: code.clone(),
                client_id: client.client_id.clone(),
                user_id: request.user_id.clone(),
                redirect_uri: request.redirect_uri,
                scopes: request.scopes,
                code_challenge: request.code_challenge,
                code_challenge_method,
                expires_at: expires_after(self.lifetime)?,
            })
            .await?;

        tracing::debug!(client_id = %record.client_id, code_id = %record.id, "Issued authorization code");
        self.audit
            .log(AuditEvent::AuthorizationCodeIssued {
                user_id: record.user_id,
                client_id: record.client_id,
            })
            .await;

        Ok(code)
    }

    /// Returns the normalized challenge method to store.
    fn check_challenge(
        &self,
        client: &Client,
        request: &AuthorizationCodeRequest,
    ) -> AuthResult<Option<String>> {
        let Some(challenge) = request.code_challenge.as_deref() else {
            if request.code_challenge_method.is_some() {
                return Err(AuthError::invalid_request(
                    "code_challenge_method without code_challenge",
                ));
            }
            if client.requires_pkce(self.require_pkce_for_public_clients) {
                return Err(AuthError::invalid_request(
                    "code_challenge is required for this client",
                ));
            }
            return Ok(None);
        };

        let method = match request.code_challenge_method.as_deref() {
            None => PkceMethod::Plain,
            Some(name) => PkceMethod::parse(name).ok_or_else(|| {
                AuthError::invalid_request(format!("unsupported code_challenge_method '{name}'"))
            })?,
        };
        if method == PkceMethod::Plain && !self.pkce.allows_plain() {
            return Err(AuthError::invalid_request(
                "the plain code_challenge_method is disabled",
            ));
        }
        // Both challenge encodings share the verifier alphabet and length.
        if !PkceValidator::is_well_formed_verifier(challenge) {
            return Err(AuthError::invalid_request("malformed code_challenge"));
        }

        Ok(Some(method.as_str().to_string()))
    }

    /// Looks up a code by plaintext value, including expired ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn find(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        self.codes.find_by_code(code).await
    }

    /// Atomically consumes a code. `true` for exactly one caller.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn consume(&self, code: &AuthorizationCode, plaintext: &str) -> AuthResult<bool> {
        let consumed = self.codes.consume(plaintext).await?;
        if consumed {
            self.audit
                .log(AuditEvent::AuthorizationCodeConsumed {
                    user_id: code.user_id.clone(),
                    client_id: code.client_id.clone(),
                })
                .await;
        } else {
            tracing::warn!(client_id = %code.client_id, code_id = %code.id, "Authorization code already consumed");
        }
        Ok(consumed)
    }

    /// Deletes expired codes.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        self.codes.delete_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NoopAuditLogger;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCodes {
        created: Mutex<Vec<NewAuthorizationCode>>,
    }

    #[async_trait]
    impl AuthorizationCodeRepository for RecordingCodes {
        async fn create(&self, code: NewAuthorizationCode) -> AuthResult<AuthorizationCode> {
            let hash = crate::crypto::hash_token(&code.code);
            self.created.lock().unwrap().push(code.clone());
            Ok(code.into_record(hash))
        }

        async fn find_by_code(&self, _code: &str) -> AuthResult<Option<AuthorizationCode>> {
            Ok(None)
        }

        async fn consume(&self, _code: &str) -> AuthResult<bool> {
            Ok(false)
        }

        async fn delete_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }
    }

    fn lifecycle(codes: Arc<RecordingCodes>, allow_plain: bool) -> AuthorizationCodeLifecycle {
        AuthorizationCodeLifecycle::new(
            codes,
            Duration::from_secs(600),
            PkceValidator::new(allow_plain),
            true,
            Arc::new(NoopAuditLogger),
        )
    }

    fn client() -> Client {
        Client::public("spa", "SPA")
            .with_redirect_uris(["https://app.example.com/cb"])
            .with_scopes(ScopeSet::parse("read write").unwrap())
    }

    fn request() -> AuthorizationCodeRequest {
        AuthorizationCodeRequest {
            user_id: "user-123".into(),
            redirect_uri: "https://app.example.com/cb".into(),
            scopes: ScopeSet::parse("read").unwrap(),
            code_challenge: Some(
                PkceValidator::generate_challenge(&PkceValidator::generate_verifier(), "S256")
                    .unwrap(),
            ),
            code_challenge_method: Some("S256".into()),
        }
    }

    #[tokio::test]
    async fn test_issue_stores_code_with_ttl() {
        let codes = Arc::new(RecordingCodes::default());
        let code = lifecycle(codes.clone(), true)
            .issue(&client(), request())
            .await
            .unwrap();

        assert_eq!(code.len(), 43);
        let created = codes.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].code, code);
        assert_eq!(created[0].code_challenge_method.as_deref(), Some("S256"));
        let ttl = created[0].expires_at - time::OffsetDateTime::now_utc();
        assert!(ttl > time::Duration::minutes(9) && ttl <= time::Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_issue_defaults_method_to_plain() {
        let codes = Arc::new(RecordingCodes::default());
        let mut req = request();
        req.code_challenge = Some(PkceValidator::generate_verifier());
        req.code_challenge_method = None;

        lifecycle(codes.clone(), true)
            .issue(&client(), req.clone())
            .await
            .unwrap();
        assert_eq!(
            codes.created.lock().unwrap()[0].code_challenge_method.as_deref(),
            Some("plain")
        );

        let err = lifecycle(codes, false)
            .issue(&client(), req)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_issue_requires_pkce_for_public_client() {
        let codes = Arc::new(RecordingCodes::default());
        let mut req = request();
        req.code_challenge = None;
        req.code_challenge_method = None;

        let err = lifecycle(codes, true)
            .issue(&client(), req)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_requests() {
        let lifecycle = lifecycle(Arc::new(RecordingCodes::default()), true);

        let mut req = request();
        req.redirect_uri = "https://evil.example.com/cb".into();
        assert!(matches!(
            lifecycle.issue(&client(), req).await,
            Err(AuthError::InvalidRequest { .. })
        ));

        let mut req = request();
        req.scopes = ScopeSet::parse("admin").unwrap();
        assert!(matches!(
            lifecycle.issue(&client(), req).await,
            Err(AuthError::InvalidScope { .. })
        ));

        let mut req = request();
        req.code_challenge_method = Some("S512".into());
        assert!(matches!(
            lifecycle.issue(&client(), req).await,
            Err(AuthError::InvalidRequest { .. })
        ));

        let mut req = request();
        req.code_challenge = Some("short".into());
        assert!(matches!(
            lifecycle.issue(&client(), req).await,
            Err(AuthError::InvalidRequest { .. })
        ));

        let no_code_grant = client().with_grant_types(vec![GrantType::RefreshToken]);
        assert!(matches!(
            lifecycle.issue(&no_code_grant, request()).await,
            Err(AuthError::UnauthorizedClient { .. })
        ));
    }
}
