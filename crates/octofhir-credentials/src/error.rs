//! Credential engine error types.
//!
//! [`AuthError`] is the closed set of failures every engine operation can
//! produce. Each variant maps onto an RFC 6749 §5.2 error code through
//! [`AuthError::oauth_error_code`]; operator faults (missing signing keys,
//! undecryptable key material, storage outages) map to `server_error`.

use std::fmt;

/// Description used for every `invalid_client` failure.
///
/// Client authentication must not reveal whether the client is unknown, the
/// secret is wrong, or the credentials were malformed.
pub const CLIENT_AUTHENTICATION_FAILED: &str = "Client authentication failed";

/// Errors that can occur while issuing or validating credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required parameter is missing or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client authentication failed.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of the failure. Always [`CLIENT_AUTHENTICATION_FAILED`]
        /// when produced by the client authenticator.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, revoked,
    /// consumed, or bound to another client or redirect URI.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The authenticated client may not use the requested grant type.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// No grant handler supports the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The requested scope exceeds what was granted or is malformed.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// A programmer-supplied argument is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// A presented token failed verification.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// No active signing key exists.
    #[error("No active signing key available")]
    NoActiveKey,

    /// Private key material could not be encrypted or decrypted.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// A signing key pair could not be generated or parsed.
    #[error("Key generation error: {message}")]
    KeyGeneration {
        /// Description of the failure.
        message: String,
    },

    /// A token could not be signed.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the failure.
        message: String,
    },

    /// A repository operation failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates the uniform `InvalidClient` error.
    #[must_use]
    pub fn invalid_client() -> Self {
        Self::InvalidClient {
            message: CLIENT_AUTHENTICATION_FAILED.to_string(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the RFC 6749 §5.2 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidArgument { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidToken { .. } => "invalid_token",
            Self::NoActiveKey
            | Self::Encryption(_)
            | Self::KeyGeneration { .. }
            | Self::Signing { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns `true` if the caller can correct the failure by changing the
    /// request or restarting the flow.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidGrant { .. }
                | Self::UnauthorizedClient { .. }
                | Self::UnsupportedGrantType { .. }
                | Self::InvalidScope { .. }
                | Self::InvalidArgument { .. }
                | Self::InvalidToken { .. }
        )
    }

    /// Returns `true` for operator faults that halt issuance.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoActiveKey | Self::Encryption(_))
    }

    /// Suggested HTTP status for the token endpoint response.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient { .. } | Self::InvalidToken { .. } => 401,
            _ if self.is_client_error() => 400,
            _ => 500,
        }
    }

    /// Returns the error category used in logs.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidScope { .. }
            | Self::UnsupportedGrantType { .. } => ErrorCategory::Request,
            Self::InvalidClient { .. } | Self::UnauthorizedClient { .. } => {
                ErrorCategory::Authentication
            }
            Self::InvalidGrant { .. } | Self::InvalidToken { .. } => ErrorCategory::Grant,
            Self::NoActiveKey
            | Self::Encryption(_)
            | Self::KeyGeneration { .. }
            | Self::Signing { .. } => ErrorCategory::KeyManagement,
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Configuration { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// High-level error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or unsupported request parameters.
    Request,
    /// Client authentication or authorization.
    Authentication,
    /// Invalid codes, refresh tokens or access tokens.
    Grant,
    /// Signing keys and their protection.
    KeyManagement,
    /// Repository failures.
    Storage,
    /// Configuration and unexpected failures.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Request => "request",
            Self::Authentication => "authentication",
            Self::Grant => "grant",
            Self::KeyManagement => "key_management",
            Self::Storage => "storage",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Failures of [`PrivateKeyEncryptionService`](crate::crypto::PrivateKeyEncryptionService).
///
/// Every decrypt failure is distinguishable so operators can tell corrupted
/// storage from tampering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    /// The master key is not base64 or is not 32 bytes long.
    #[error("Invalid master key: {0}")]
    InvalidMasterKey(String),

    /// The encrypted blob is not valid base64.
    #[error("Encrypted payload is not valid base64")]
    InvalidBase64,

    /// The decoded payload cannot hold a nonce and an authentication tag.
    #[error("Encrypted payload too short: {len} bytes, need at least {min}")]
    PayloadTooShort {
        /// Decoded payload length.
        len: usize,
        /// Minimum length (nonce + tag).
        min: usize,
    },

    /// The authentication tag did not verify.
    #[error("Encrypted payload failed authentication")]
    AuthenticationFailed,

    /// The cipher refused to encrypt.
    #[error("Encryption failed")]
    EncryptFailed,

    /// Decrypted bytes are not UTF-8.
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Reasons a client secret is rejected by
/// [`SecretEntropyValidator::validate`](crate::crypto::SecretEntropyValidator::validate).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SecretValidationError {
    /// Fewer characters than required.
    #[error("Secret is too short: {length} characters, minimum is {minimum}")]
    TooShort {
        /// Secret length in characters.
        length: usize,
        /// Required minimum.
        minimum: usize,
    },

    /// The secret is one character repeated.
    #[error("Secret consists of a single repeated character")]
    RepeatedCharacter,

    /// The secret is an ascending or descending character run.
    #[error("Secret is a sequential character run")]
    Sequential,

    /// The secret contains a keyboard or counting sequence.
    #[error("Secret contains the keyboard sequence '{sequence}'")]
    KeyboardPattern {
        /// The matched sequence.
        sequence: &'static str,
    },

    /// The secret repeats a short block.
    #[error("Secret repeats a block of {period} characters")]
    RepeatingPattern {
        /// Length of the repeated block.
        period: usize,
    },

    /// The secret starts with a well-known weak word.
    #[error("Secret starts with the weak prefix '{prefix}'")]
    WeakPrefix {
        /// The matched prefix.
        prefix: &'static str,
    },

    /// Shannon entropy is below the threshold.
    #[error("Secret entropy {bits_per_char:.2} bits/char is below {minimum:.1}")]
    LowEntropy {
        /// Measured entropy.
        bits_per_char: f64,
        /// Required minimum.
        minimum: f64,
    },
}

/// Result type alias for engine operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(
            AuthError::invalid_request("missing").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(AuthError::invalid_client().oauth_error_code(), "invalid_client");
        assert_eq!(
            AuthError::invalid_grant("expired").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::unauthorized_client("no").oauth_error_code(),
            "unauthorized_client"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            AuthError::invalid_scope("admin").oauth_error_code(),
            "invalid_scope"
        );
        assert_eq!(AuthError::NoActiveKey.oauth_error_code(), "server_error");
        assert_eq!(
            AuthError::from(EncryptionError::AuthenticationFailed).oauth_error_code(),
            "server_error"
        );
    }

    #[test]
    fn test_invalid_client_message_is_uniform() {
        let err = AuthError::invalid_client();
        assert_eq!(
            err.to_string(),
            format!("Invalid client: {CLIENT_AUTHENTICATION_FAILED}")
        );
    }

    #[test]
    fn test_client_and_fatal_classification() {
        assert!(AuthError::invalid_grant("x").is_client_error());
        assert!(!AuthError::invalid_grant("x").is_fatal());
        assert!(AuthError::NoActiveKey.is_fatal());
        assert!(!AuthError::NoActiveKey.is_client_error());
        assert!(!AuthError::storage("down").is_client_error());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_client().http_status(), 401);
        assert_eq!(AuthError::invalid_grant("x").http_status(), 400);
        assert_eq!(AuthError::NoActiveKey.http_status(), 500);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(AuthError::storage("x").category().to_string(), "storage");
        assert_eq!(
            AuthError::NoActiveKey.category(),
            ErrorCategory::KeyManagement
        );
    }

    #[test]
    fn test_too_short_message() {
        let err = SecretValidationError::TooShort {
            length: 10,
            minimum: 32,
        };
        assert!(err.to_string().contains("too short"));
    }
}
