//! Shared test infrastructure: engine construction, client registration and
//! tracing setup.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use octofhir_credentials::config::EngineConfig;
use octofhir_credentials::crypto::{
    ClientSecretHasher, KeyGeneratorRegistry, PrivateKeyEncryptionService,
};
use octofhir_credentials::oauth::PkceValidator;
use octofhir_credentials::token::AuthorizationCodeRequest;
use octofhir_credentials::types::{Client, GrantType, ScopeSet, SigningAlgorithm};
use octofhir_credentials::{TokenEngine, TokenRequest, TokenResponse};
use octofhir_credentials_memory::{InMemoryAuditLogger, InMemoryCredentialStore};
use tracing_subscriber::EnvFilter;

pub const ISSUER: &str = "https://auth.example.test";
pub const REDIRECT_URI: &str = "https://app.example.test/callback";
pub const CONFIDENTIAL_ID: &str = "backend-service";
pub const CONFIDENTIAL_SECRET: &str = "Zq8!vN2#rT5@kL9$wX3^mB7&pF4*hJ6(dS1)";
pub const PUBLIC_ID: &str = "mobile-app";
pub const USER_ID: &str = "user-123";

/// RFC 7636 Appendix B.
pub const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
pub const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

// =============================================================================
// Test Infrastructure
// =============================================================================

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn fast_hasher() -> ClientSecretHasher {
    let params = argon2::Params::new(1024, 1, 1, None).expect("argon2 params");
    ClientSecretHasher::with_params(params).expect("hasher")
}

pub fn test_config(algorithm: SigningAlgorithm) -> EngineConfig {
    let mut config = EngineConfig {
        issuer: ISSUER.to_string(),
        key_encryption_key: PrivateKeyEncryptionService::generate_master_key(),
        ..EngineConfig::default()
    };
    config.signing.algorithm = algorithm;
    config.signing.rsa_modulus_bits = 2048;
    config.tokens.access_token_lifetime = Duration::from_secs(3600);
    config
}

pub struct TestHarness {
    pub engine: TokenEngine,
    pub store: InMemoryCredentialStore,
    pub audit: Arc<InMemoryAuditLogger>,
    pub hasher: ClientSecretHasher,
}

impl TestHarness {
    /// Engine with one active `algorithm` key and the two standard clients.
    pub async fn new(algorithm: SigningAlgorithm) -> Self {
        Self::with_config(test_config(algorithm)).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        init_tracing();

        let store = InMemoryCredentialStore::new();
        let audit = Arc::new(InMemoryAuditLogger::new());
        let hasher = fast_hasher();
        let generators = KeyGeneratorRegistry::standard(config.signing.rsa_modulus_bits)
            .expect("key generators");

        let engine = TokenEngine::builder(config, store.repositories())
            .audit_logger(audit.clone())
            .secret_hasher(hasher.clone())
            .key_generators(generators)
            .build()
            .expect("build engine");
        engine
            .keys()
            .ensure_active_key()
            .await
            .expect("initial signing key");

        let harness = Self {
            engine,
            store,
            audit,
            hasher,
        };
        harness.register_standard_clients();
        harness
    }

    fn register_standard_clients(&self) {
        let secret_hash = self
            .hasher
            .hash(CONFIDENTIAL_SECRET)
            .expect("hash client secret");
        self.store.clients.insert(
            Client::confidential(CONFIDENTIAL_ID, "Backend service", secret_hash)
                .with_redirect_uris([REDIRECT_URI])
                .with_scopes(scopes("read write admin")),
        )
        .expect("register confidential client");
        self.store.clients.insert(
            Client::public(PUBLIC_ID, "Mobile app")
                .with_redirect_uris([REDIRECT_URI])
                .with_scopes(scopes("openid read")),
        )
        .expect("register public client");
    }

    /// Registers a confidential client limited to `grant_types`.
    pub fn register_confidential(&self, client_id: &str, grant_types: Vec<GrantType>) {
        let secret_hash = self
            .hasher
            .hash(CONFIDENTIAL_SECRET)
            .expect("hash client secret");
        self.store.clients.insert(
            Client::confidential(client_id, client_id, secret_hash)
                .with_redirect_uris([REDIRECT_URI])
                .with_scopes(scopes("read write"))
                .with_grant_types(grant_types),
        )
        .expect("register client");
    }

    pub async fn issue_code(&self, client_id: &str, scope: &str, pkce: bool) -> String {
        let (challenge, method) = if pkce {
            (Some(CHALLENGE.to_string()), Some("S256".to_string()))
        } else {
            (None, None)
        };
        self.engine
            .issue_authorization_code(
                client_id,
                AuthorizationCodeRequest {
                    user_id: USER_ID.to_string(),
                    redirect_uri: REDIRECT_URI.to_string(),
                    scopes: scopes(scope),
                    code_challenge: challenge,
                    code_challenge_method: method,
                },
            )
            .await
            .expect("issue authorization code")
    }

    /// Runs the confidential authorization code flow and returns the
    /// token response.
    pub async fn confidential_login(&self, scope: &str) -> TokenResponse {
        let code = self.issue_code(CONFIDENTIAL_ID, scope, false).await;
        self.engine
            .token(
                &TokenRequest::new("authorization_code")
                    .with_basic_auth(CONFIDENTIAL_ID, CONFIDENTIAL_SECRET)
                    .with_code(code, REDIRECT_URI),
            )
            .await
            .expect("code exchange")
    }

    pub async fn audit_names(&self) -> Vec<&'static str> {
        self.audit.names().await
    }
}

pub fn scopes(scope: &str) -> ScopeSet {
    ScopeSet::parse(scope).expect("scope")
}

pub fn refresh_request(refresh_token: &str) -> TokenRequest {
    TokenRequest::new("refresh_token")
        .with_client_credentials(CONFIDENTIAL_ID, CONFIDENTIAL_SECRET)
        .with_refresh_token(refresh_token)
}

pub fn pkce_challenge(verifier: &str) -> String {
    PkceValidator::generate_challenge(verifier, "S256").expect("challenge")
}
