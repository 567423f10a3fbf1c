//! The credential engine.
//!
//! [`TokenEngine`] wires repositories, configuration and grant handlers once
//! at construction and exposes the token endpoint entry point together with
//! the revocation, logout, key management and maintenance operations.
//!
//! # Example
//!
//! ```ignore
//! let engine = TokenEngine::builder(config, repositories).build()?;
//! engine.keys().ensure_active_key().await?;
//!
//! let response = engine.token(&request).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::audit::{AuditEvent, AuditLogger, NoopAuditLogger, TracingAuditLogger};
use crate::config::EngineConfig;
use crate::crypto::{
    ClientSecretHasher, KeyGeneratorRegistry, PrivateKeyEncryptionService, SecretEntropyValidator,
};
use crate::error::{AuthError, AuthResult};
use crate::oauth::{
    AuthorizationCodeGrantHandler, ClientAuthenticator, ClientCredentialsGrantHandler,
    GrantContext, GrantHandlerDispatcher, PkceValidator, RefreshTokenGrantHandler, TokenRequest,
    TokenResponse,
};
use crate::storage::{
    AuthorizationCodeRepository, ClientRepository, KeyRepository, RefreshTokenRepository,
    TokenBlacklistRepository,
};
use crate::token::jwt::looks_like_jwt;
use crate::token::{
    AccessTokenClaims, AuthorizationCodeLifecycle, AuthorizationCodeRequest, JwtIssuer,
    JwtVerifier, KeyRotationService, RefreshTokenLifecycle, TokenBlacklist, expires_after,
    lifetime_secs,
};

/// Number of attempts to draw a secret that passes entropy validation.
const SECRET_GENERATION_ATTEMPTS: usize = 8;

/// The repositories the engine runs on.
#[derive(Clone)]
pub struct Repositories {
    /// Client registrations.
    pub clients: Arc<dyn ClientRepository>,
    /// Authorization codes.
    pub authorization_codes: Arc<dyn AuthorizationCodeRepository>,
    /// Refresh tokens.
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    /// Revoked access token identifiers.
    pub blacklist: Arc<dyn TokenBlacklistRepository>,
    /// Signing keys.
    pub keys: Arc<dyn KeyRepository>,
}

/// Outcome of [`TokenEngine::logout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    /// Refresh tokens revoked.
    pub revoked_refresh_tokens: u64,
    /// Whether the presented access token was blacklisted.
    pub access_token_revoked: bool,
}

/// Rows removed by [`TokenEngine::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Expired authorization codes.
    pub authorization_codes: u64,
    /// Expired refresh tokens.
    pub refresh_tokens: u64,
    /// Blacklist entries whose token expired.
    pub blacklist_entries: u64,
    /// Signing keys past retention.
    pub signing_keys: u64,
}

impl PurgeReport {
    /// Total rows removed.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.authorization_codes + self.refresh_tokens + self.blacklist_entries + self.signing_keys
    }
}

/// A newly generated client secret.
pub struct GeneratedClientSecret {
    /// Plaintext, shown to the client owner once.
    pub secret: String,
    /// PHC hash to store in [`Client::secret_hash`](crate::types::Client::secret_hash).
    pub hash: String,
}

impl std::fmt::Debug for GeneratedClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedClientSecret")
            .field("secret", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}

/// Builder for [`TokenEngine`].
pub struct TokenEngineBuilder {
    config: EngineConfig,
    repositories: Repositories,
    audit: Option<Arc<dyn AuditLogger>>,
    hasher: Option<ClientSecretHasher>,
    generators: Option<KeyGeneratorRegistry>,
}

impl TokenEngineBuilder {
    /// Sets the audit sink. Defaults to [`TracingAuditLogger`]; ignored when
    /// `audit.enabled` is false.
    #[must_use]
    pub fn audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Sets the client secret hasher. Defaults to Argon2id defaults.
    #[must_use]
    pub fn secret_hasher(mut self, hasher: ClientSecretHasher) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Sets the key generators. Defaults to
    /// [`KeyGeneratorRegistry::standard`] with the configured RSA modulus.
    #[must_use]
    pub fn key_generators(mut self, generators: KeyGeneratorRegistry) -> Self {
        self.generators = Some(generators);
        self
    }

    /// Validates the configuration and assembles the engine.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for an invalid configuration, `Encryption`
    /// for an unusable master key, or an error constructing the defaults.
    pub fn build(self) -> AuthResult<TokenEngine> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let audit: Arc<dyn AuditLogger> = if config.audit.enabled {
            self.audit.unwrap_or_else(|| Arc::new(TracingAuditLogger))
        } else {
            Arc::new(NoopAuditLogger)
        };
        let hasher = Arc::new(match self.hasher {
            Some(hasher) => hasher,
            None => ClientSecretHasher::new()?,
        });
        let generators = match self.generators {
            Some(generators) => generators,
            None => KeyGeneratorRegistry::standard(config.signing.rsa_modulus_bits)?,
        };
        let encryption = Arc::new(PrivateKeyEncryptionService::new(
            &config.key_encryption_key,
        )?);
        let repos = self.repositories;

        let pkce = PkceValidator::new(config.pkce.allow_plain);
        let require_pkce = config.pkce.require_for_public_clients;

        let context = Arc::new(GrantContext::new(
            ClientAuthenticator::new(repos.clients.clone(), hasher.clone(), audit.clone()),
            JwtIssuer::new(config.issuer.clone(), repos.keys.clone(), encryption.clone()),
            config.audience.clone(),
            lifetime_secs(config.tokens.access_token_lifetime)?,
            audit.clone(),
        ));
        let authorization_codes = Arc::new(AuthorizationCodeLifecycle::new(
            repos.authorization_codes.clone(),
            config.tokens.authorization_code_lifetime,
            pkce,
            require_pkce,
            audit.clone(),
        ));
        let refresh_tokens = Arc::new(RefreshTokenLifecycle::new(
            repos.refresh_tokens.clone(),
            config.tokens.refresh_token_lifetime,
            audit.clone(),
        ));

        let dispatcher = GrantHandlerDispatcher::new()
            .with(AuthorizationCodeGrantHandler::new(
                context.clone(),
                authorization_codes.clone(),
                refresh_tokens.clone(),
                pkce,
                require_pkce,
            ))
            .with(RefreshTokenGrantHandler::new(
                context.clone(),
                refresh_tokens.clone(),
            ))
            .with(ClientCredentialsGrantHandler::new(context));

        let verifier = JwtVerifier::new(config.issuer.clone(), repos.keys.clone())
            .with_blacklist(repos.blacklist.clone());
        let keys = KeyRotationService::new(
            repos.keys.clone(),
            encryption,
            generators,
            config.signing.algorithm,
            config.signing.key_retention,
            audit.clone(),
        );

        tracing::info!(
            issuer = %config.issuer,
            algorithm = %config.signing.algorithm,
            grant_types = ?dispatcher.grant_types(),
            "Token engine initialized"
        );

        Ok(TokenEngine {
            dispatcher,
            authorization_codes,
            refresh_tokens,
            blacklist: TokenBlacklist::new(repos.blacklist, audit.clone()),
            verifier,
            keys,
            clients: repos.clients,
            hasher,
            secrets: SecretEntropyValidator::new(),
            audit,
            config,
        })
    }
}

/// OAuth 2.0 credential issuance and validation engine.
pub struct TokenEngine {
    config: EngineConfig,
    dispatcher: GrantHandlerDispatcher,
    authorization_codes: Arc<AuthorizationCodeLifecycle>,
    refresh_tokens: Arc<RefreshTokenLifecycle>,
    blacklist: TokenBlacklist,
    verifier: JwtVerifier,
    keys: KeyRotationService,
    clients: Arc<dyn ClientRepository>,
    hasher: Arc<ClientSecretHasher>,
    secrets: SecretEntropyValidator,
    audit: Arc<dyn AuditLogger>,
}

impl TokenEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder(config: EngineConfig, repositories: Repositories) -> TokenEngineBuilder {
        TokenEngineBuilder {
            config,
            repositories,
            audit: None,
            hasher: None,
            generators: None,
        }
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token endpoint entry point.
    ///
    /// # Errors
    ///
    /// Returns the OAuth 2.0 error for the request. Map it to a response
    /// body with [`TokenErrorResponse`](crate::oauth::TokenErrorResponse).
    pub async fn token(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let result = self.dispatcher.dispatch(request).await;
        if let Err(e) = &result {
            if e.is_client_error() {
                tracing::debug!(
                    grant_type = request.grant_type.as_deref().unwrap_or("-"),
                    error = e.oauth_error_code(),
                    "Token request rejected"
                );
            } else {
                tracing::error!(
                    grant_type = request.grant_type.as_deref().unwrap_or("-"),
                    category = %e.category(),
                    error = %e,
                    "Token request failed"
                );
            }
        }
        result
    }

    /// Issues an authorization code for an approved authorization request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an unknown or inactive client, plus the
    /// errors of [`AuthorizationCodeLifecycle::issue`].
    pub async fn issue_authorization_code(
        &self,
        client_id: &str,
        request: AuthorizationCodeRequest,
    ) -> AuthResult<String> {
        let client = self
            .clients
            .find_by_public_id(client_id)
            .await?
            .filter(|client| client.active)
            .ok_or_else(|| AuthError::invalid_request("Unknown client_id"))?;

        self.authorization_codes.issue(&client, request).await
    }

    /// Verifies an access token, including the blacklist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if verification fails.
    pub async fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.verifier.verify(token).await
    }

    /// Blacklists an access token given as a JWT or as a bare `jti`.
    ///
    /// A JWT must carry a valid signature from a retained key and is
    /// blacklisted until its own `exp`; an already expired JWT needs no
    /// entry. A bare `jti` is blacklisted for one access token lifetime.
    /// Returns `true` if an entry was written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for a JWT that fails signature verification,
    /// `InvalidArgument` for an empty value, or a storage error.
    pub async fn revoke_access_token(
        &self,
        token_or_jti: &str,
        reason: Option<String>,
    ) -> AuthResult<bool> {
        if looks_like_jwt(token_or_jti) {
            let claims = self.verifier.verify_signature(token_or_jti).await?;
            return self.blacklist_claims(&claims, reason).await;
        }

        let expires_at = expires_after(self.config.tokens.access_token_lifetime)?;
        self.blacklist.revoke(token_or_jti, expires_at, reason).await?;
        Ok(true)
    }

    async fn blacklist_claims(
        &self,
        claims: &AccessTokenClaims,
        reason: Option<String>,
    ) -> AuthResult<bool> {
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
            .map_err(|_| AuthError::invalid_token("exp is out of range"))?;
        if expires_at <= OffsetDateTime::now_utc() {
            tracing::debug!(jti = %claims.jti, "Access token already expired; nothing to revoke");
            return Ok(false);
        }
        self.blacklist.revoke(&claims.jti, expires_at, reason).await?;
        Ok(true)
    }

    /// Revokes a refresh token on behalf of the client it was issued to.
    ///
    /// Unknown tokens are not an error (RFC 7009 §2.2); the result is
    /// `false` for them and for tokens that were already revoked.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the token belongs to another client, or a
    /// storage error.
    pub async fn revoke_refresh_token(&self, token: &str, client_id: &str) -> AuthResult<bool> {
        let Some(record) = self.refresh_tokens.find(token).await? else {
            return Ok(false);
        };
        if record.client_id != client_id {
            tracing::warn!(client_id, token_id = %record.id, "Refresh token revocation by another client");
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to another client",
            ));
        }
        self.refresh_tokens.revoke(token, &record).await
    }

    /// Ends every session of a user: revokes all their refresh tokens and
    /// blacklists the presented access token, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the access token fails signature
    /// verification or belongs to another user, or a storage error.
    pub async fn logout(
        &self,
        user_id: &str,
        access_token: Option<&str>,
    ) -> AuthResult<LogoutOutcome> {
        if user_id.is_empty() {
            return Err(AuthError::invalid_argument("user_id must not be empty"));
        }

        let claims = match access_token {
            Some(token) => {
                let claims = self.verifier.verify_signature(token).await?;
                if claims.sub != user_id {
                    return Err(AuthError::invalid_token(
                        "access token does not belong to the user",
                    ));
                }
                Some(claims)
            }
            None => None,
        };

        let revoked_refresh_tokens = self.refresh_tokens.revoke_all_for_user(user_id).await?;
        let access_token_revoked = match &claims {
            Some(claims) => {
                self.blacklist_claims(claims, Some("logout".to_string()))
                    .await?
            }
            None => false,
        };

        tracing::info!(revoked_refresh_tokens, access_token_revoked, "User logged out");
        self.audit
            .log(AuditEvent::UserLoggedOut {
                user_id: user_id.to_string(),
                revoked_refresh_tokens,
            })
            .await;

        Ok(LogoutOutcome {
            revoked_refresh_tokens,
            access_token_revoked,
        })
    }

    /// Sweeps expired codes, refresh tokens, blacklist entries and retained
    /// signing keys.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub async fn purge_expired(&self) -> AuthResult<PurgeReport> {
        let report = PurgeReport {
            authorization_codes: self.authorization_codes.purge_expired().await?,
            refresh_tokens: self.refresh_tokens.purge_expired().await?,
            blacklist_entries: self.blacklist.delete_expired().await?,
            signing_keys: self.keys.purge_expired().await?,
        };
        if report.total() > 0 {
            tracing::info!(?report, "Purged expired credentials");
        }
        Ok(report)
    }

    /// Generates a client secret that passes entropy validation, with its
    /// hash.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if hashing fails or no acceptable secret could be
    /// drawn.
    pub fn generate_client_secret(&self) -> AuthResult<GeneratedClientSecret> {
        for _ in 0..SECRET_GENERATION_ATTEMPTS {
            let secret = self.secrets.generate_default();
            if self.secrets.validate(&secret).is_ok() {
                let hash = self.hasher.hash(&secret)?;
                return Ok(GeneratedClientSecret { secret, hash });
            }
        }
        Err(AuthError::internal(
            "could not generate a client secret with sufficient entropy",
        ))
    }

    /// Signing key administration.
    #[must_use]
    pub fn keys(&self) -> &KeyRotationService {
        &self.keys
    }

    /// Access token verifier.
    #[must_use]
    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }

    /// Authorization code lifecycle.
    #[must_use]
    pub fn authorization_codes(&self) -> &AuthorizationCodeLifecycle {
        &self.authorization_codes
    }

    /// Refresh token lifecycle.
    #[must_use]
    pub fn refresh_tokens(&self) -> &RefreshTokenLifecycle {
        &self.refresh_tokens
    }

    /// Access token blacklist.
    #[must_use]
    pub fn blacklist(&self) -> &TokenBlacklist {
        &self.blacklist
    }

    /// Client secret hasher.
    #[must_use]
    pub fn hasher(&self) -> &ClientSecretHasher {
        &self.hasher
    }

    /// Secret generation and validation.
    #[must_use]
    pub fn secrets(&self) -> &SecretEntropyValidator {
        &self.secrets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_report_total() {
        let report = PurgeReport {
            authorization_codes: 1,
            refresh_tokens: 2,
            blacklist_entries: 3,
            signing_keys: 4,
        };
        assert_eq!(report.total(), 10);
        assert_eq!(PurgeReport::default().total(), 0);
    }

    #[test]
    fn test_generated_secret_debug_redacts() {
        let generated = GeneratedClientSecret {
            secret: "plaintext-secret".into(),
            hash: "$argon2id$...".into(),
        };
        assert!(!format!("{generated:?}").contains("plaintext-secret"));
    }
}
