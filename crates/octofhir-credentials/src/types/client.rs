//! OAuth 2.0 client registration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::scope::ScopeSet;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(format!("unknown grant type '{other}'")),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client.
///
/// Confidential clients carry an Argon2 hash of their secret in
/// `secret_hash`; public clients have none and rely on PKCE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Internal identifier.
    pub id: Uuid,

    /// Public `client_id` used in OAuth flows. Unique.
    pub client_id: String,

    /// PHC-formatted hash of the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,

    /// Human-readable display name.
    pub name: String,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,

    /// Scopes this client may be granted.
    #[serde(default)]
    pub scopes: ScopeSet,

    /// Whether this client authenticates with a secret.
    pub confidential: bool,

    /// Whether authorization codes for this client must carry a PKCE challenge.
    #[serde(default)]
    pub pkce_required: bool,

    /// Whether the client may currently authenticate.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Registration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

fn default_active() -> bool {
    true
}

impl Client {
    /// Creates a public client.
    #[must_use]
    pub fn public(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            secret_hash: None,
            name: name.into(),
            redirect_uris: Vec::new(),
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scopes: ScopeSet::new(),
            confidential: false,
            pkce_required: true,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a confidential client with an already hashed secret.
    #[must_use]
    pub fn confidential(
        client_id: impl Into<String>,
        name: impl Into<String>,
        secret_hash: impl Into<String>,
    ) -> Self {
        Self {
            secret_hash: Some(secret_hash.into()),
            confidential: true,
            pkce_required: false,
            grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::ClientCredentials,
            ],
            ..Self::public(client_id, name)
        }
    }

    /// Sets the redirect URIs.
    #[must_use]
    pub fn with_redirect_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redirect_uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the allowed scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the allowed grant types.
    #[must_use]
    pub fn with_grant_types(mut self, grant_types: Vec<GrantType>) -> Self {
        self.grant_types = grant_types;
        self
    }

    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is invalid.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        if !self.confidential && self.grant_types.contains(&GrantType::ClientCredentials) {
            return Err(ClientValidationError::PublicClientCredentials);
        }

        if self.confidential && self.secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        if !self.confidential && self.secret_hash.is_some() {
            return Err(ClientValidationError::PublicClientSecret);
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        Ok(())
    }

    /// Checks if the given redirect URI is registered for this client.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the client may use the given grant type.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns `true` if authorization codes for this client need PKCE,
    /// either by registration or because public clients require it.
    #[must_use]
    pub fn requires_pkce(&self, require_for_public_clients: bool) -> bool {
        self.pkce_required || (!self.confidential && require_for_public_clients)
    }
}

/// Client registration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID is empty.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// No grant types specified.
    #[error("at least one grant type is required")]
    NoGrantTypes,

    /// Public clients cannot use `client_credentials`.
    #[error("public clients cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Confidential clients must have a secret.
    #[error("confidential clients must have a client secret")]
    MissingSecret,

    /// Public clients must not have a secret.
    #[error("public clients must not have a client secret")]
    PublicClientSecret,

    /// Authorization code flow needs redirect URIs.
    #[error("authorization_code grant requires at least one redirect_uri")]
    NoRedirectUris,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_client() -> Client {
        Client::public("spa", "Single Page App").with_redirect_uris(["https://app/cb"])
    }

    fn confidential_client() -> Client {
        Client::confidential("backend", "Backend", "$argon2id$stub")
            .with_redirect_uris(["https://backend/cb"])
    }

    #[test]
    fn test_valid_clients() {
        assert!(public_client().validate().is_ok());
        assert!(confidential_client().validate().is_ok());
    }

    #[test]
    fn test_empty_client_id() {
        let mut client = public_client();
        client.client_id = String::new();
        assert_eq!(client.validate(), Err(ClientValidationError::EmptyClientId));
    }

    #[test]
    fn test_public_client_with_client_credentials() {
        let client = public_client().with_grant_types(vec![GrantType::ClientCredentials]);
        assert_eq!(
            client.validate(),
            Err(ClientValidationError::PublicClientCredentials)
        );
    }

    #[test]
    fn test_confidential_without_secret() {
        let mut client = confidential_client();
        client.secret_hash = None;
        assert_eq!(client.validate(), Err(ClientValidationError::MissingSecret));
    }

    #[test]
    fn test_public_with_secret() {
        let mut client = public_client();
        client.secret_hash = Some("hash".into());
        assert_eq!(
            client.validate(),
            Err(ClientValidationError::PublicClientSecret)
        );
    }

    #[test]
    fn test_auth_code_without_redirect_uris() {
        let client = Client::public("spa", "SPA");
        assert_eq!(client.validate(), Err(ClientValidationError::NoRedirectUris));
    }

    #[test]
    fn test_requires_pkce() {
        let public = public_client();
        assert!(public.requires_pkce(true));

        let mut relaxed = public_client();
        relaxed.pkce_required = false;
        assert!(!relaxed.requires_pkce(false));
        assert!(relaxed.requires_pkce(true));

        assert!(!confidential_client().requires_pkce(true));
    }

    #[test]
    fn test_grant_type_round_trip() {
        for grant in [
            GrantType::AuthorizationCode,
            GrantType::ClientCredentials,
            GrantType::RefreshToken,
        ] {
            assert_eq!(grant.as_str().parse::<GrantType>(), Ok(grant));
        }
        assert!("password".parse::<GrantType>().is_err());
    }
}
