//! Token endpoint request and response types.
//!
//! The HTTP boundary maps the form-encoded body onto [`TokenRequest`] and
//! serializes [`TokenResponse`] or [`TokenErrorResponse`] per RFC 6749 §5.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthError, CLIENT_AUTHENTICATION_FAILED};

/// Token request parameters (RFC 6749 §4.1.3, §4.4.2, §6).
///
/// Every field is optional at this level; handlers report missing required
/// parameters as `invalid_request`.
///
/// # Client Authentication
///
/// Clients authenticate using one of:
/// - HTTP Basic Auth header, carried in `authorization`
/// - `client_id` + `client_secret` in body
/// - `client_id` only (public clients)
#[derive(Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,

    /// Raw `Authorization` header value, if the request carried one.
    #[serde(skip)]
    pub authorization: Option<String>,
}

impl TokenRequest {
    /// Creates a request for `grant_type` with no other parameters.
    #[must_use]
    pub fn new(grant_type: impl Into<String>) -> Self {
        Self {
            grant_type: Some(grant_type.into()),
            ..Self::default()
        }
    }

    /// Attaches a raw `Authorization` header value.
    #[must_use]
    pub fn with_authorization(mut self, header: impl Into<String>) -> Self {
        self.authorization = Some(header.into());
        self
    }

    /// Attaches an HTTP Basic header for the given credentials.
    #[must_use]
    pub fn with_basic_auth(self, client_id: &str, client_secret: &str) -> Self {
        let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
        self.with_authorization(format!("Basic {encoded}"))
    }

    /// Sets body client credentials (`client_secret_post`).
    #[must_use]
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Sets the body `client_id` only.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets `code` and `redirect_uri`.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Sets `code_verifier`.
    #[must_use]
    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    /// Sets `refresh_token`.
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Sets `scope`.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("code", &redacted(&self.code))
            .field("redirect_uri", &self.redirect_uri)
            .field("code_verifier", &redacted(&self.code_verifier))
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("scope", &self.scope)
            .field("authorization", &redacted(&self.authorization))
            .finish()
    }
}

/// Successful token response (RFC 6749 §5.1).
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "abc123...",
///   "scope": "read write"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Refresh token, when the grant issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Extra top-level response members.
    #[serde(flatten)]
    pub additional_data: Map<String, Value>,
}

impl TokenResponse {
    /// Creates a Bearer response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: None,
            scope: None,
            additional_data: Map::new(),
        }
    }

    /// Adds a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Sets the granted scope. Empty scope strings are omitted.
    #[must_use]
    pub fn with_scope(mut self, scope: String) -> Self {
        self.scope = (!scope.is_empty()).then_some(scope);
        self
    }

    /// Adds an extra response member.
    #[must_use]
    pub fn with_additional_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_data.insert(key.into(), value);
        self
    }
}

/// Description used for every `server_error` body.
pub const SERVER_ERROR_DESCRIPTION: &str =
    "The authorization server encountered an unexpected condition";

/// Error response body (RFC 6749 §5.2).
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Authorization code expired"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&AuthError> for TokenErrorResponse {
    fn from(err: &AuthError) -> Self {
        let description = match err {
            AuthError::InvalidClient { .. } => CLIENT_AUTHENTICATION_FAILED.to_string(),
            AuthError::InvalidRequest { message }
            | AuthError::InvalidGrant { message }
            | AuthError::UnauthorizedClient { message }
            | AuthError::InvalidScope { message }
            | AuthError::InvalidArgument { message }
            | AuthError::InvalidToken { message } => message.clone(),
            AuthError::UnsupportedGrantType { grant_type } => {
                format!("Grant type '{grant_type}' is not supported")
            }
            _ => SERVER_ERROR_DESCRIPTION.to_string(),
        };
        Self {
            error: err.oauth_error_code().to_string(),
            error_description: Some(description),
        }
    }
}

impl From<AuthError> for TokenErrorResponse {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize_form_fields() {
        let json = r#"{
            "grant_type": "authorization_code",
            "code": "abc",
            "redirect_uri": "https://app.example.com/cb",
            "client_id": "app"
        }"#;
        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type.as_deref(), Some("authorization_code"));
        assert_eq!(request.code.as_deref(), Some("abc"));
        assert!(request.authorization.is_none());
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_request_debug_redacts_secrets() {
        let request = TokenRequest::new("refresh_token")
            .with_client_credentials("app", "super-secret")
            .with_refresh_token("refresh-plaintext");
        let debug = format!("{request:?}");
        assert!(debug.contains("app"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("refresh-plaintext"));
    }

    #[test]
    fn test_basic_auth_builder() {
        let request = TokenRequest::new("client_credentials").with_basic_auth("app", "s3cret");
        assert_eq!(request.authorization.as_deref(), Some("Basic YXBwOnMzY3JldA=="));
    }

    #[test]
    fn test_response_serialization() {
        let response = TokenResponse::new("jwt".into(), 3600)
            .with_refresh_token("rt".into())
            .with_scope("read write".into())
            .with_additional_data("patient", Value::String("123".into()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["refresh_token"], "rt");
        assert_eq!(json["scope"], "read write");
        assert_eq!(json["patient"], "123");
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let response = TokenResponse::new("jwt".into(), 60).with_scope(String::new());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("refresh_token").is_none());
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_error_response_codes() {
        let body = TokenErrorResponse::from(&AuthError::invalid_grant("Authorization code expired"));
        assert_eq!(body.error, "invalid_grant");
        assert_eq!(
            body.error_description.as_deref(),
            Some("Authorization code expired")
        );

        let body = TokenErrorResponse::from(AuthError::unsupported_grant_type("password"));
        assert_eq!(body.error, "unsupported_grant_type");
    }

    #[test]
    fn test_error_response_hides_details() {
        let body = TokenErrorResponse::from(&AuthError::invalid_client());
        assert_eq!(
            body.error_description.as_deref(),
            Some(CLIENT_AUTHENTICATION_FAILED)
        );

        let body = TokenErrorResponse::from(&AuthError::storage("connection refused to 10.0.0.5"));
        assert_eq!(body.error, "server_error");
        assert_eq!(
            body.error_description.as_deref(),
            Some(SERVER_ERROR_DESCRIPTION)
        );

        let body = TokenErrorResponse::from(&AuthError::NoActiveKey);
        assert_eq!(body.error, "server_error");
    }
}
