//! PKCE (Proof Key for Code Exchange) per RFC 7636.
//!
//! Challenge generation is a programmer-facing path and rejects unknown
//! methods with an error. Validation handles attacker-controlled input and
//! only ever answers `true` or `false`.
//!
//! # Example
//!
//! ```
//! use octofhir_credentials::oauth::PkceValidator;
//!
//! let validator = PkceValidator::default();
//! let verifier = PkceValidator::generate_verifier();
//! let challenge = PkceValidator::generate_challenge(&verifier, "S256").unwrap();
//!
//! assert!(validator.validate(&verifier, &challenge, "S256"));
//! assert!(!validator.validate(&verifier, &challenge, "S512"));
//! ```

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::crypto::constant_time_eq;
use crate::error::{AuthError, AuthResult};

/// Minimum verifier length (RFC 7636 §4.1).
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum verifier length (RFC 7636 §4.1).
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// PKCE code challenge methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkceMethod {
    /// The challenge is the verifier itself.
    Plain,
    /// The challenge is `BASE64URL(SHA256(verifier))`.
    S256,
}

impl PkceMethod {
    /// Parses a method name. Names are case-sensitive.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "plain" => Some(Self::Plain),
            "S256" => Some(Self::S256),
            _ => None,
        }
    }

    /// Returns the wire name of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }

    fn derive(self, verifier: &str) -> String {
        match self {
            Self::Plain => verifier.to_string(),
            Self::S256 => {
                let digest = Sha256::digest(verifier.as_bytes());
                URL_SAFE_NO_PAD.encode(digest)
            }
        }
    }
}

impl fmt::Display for PkceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PkceMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            AuthError::invalid_argument(format!("unsupported PKCE challenge method '{s}'"))
        })
    }
}

/// Derives and checks PKCE challenges.
#[derive(Debug, Clone, Copy)]
pub struct PkceValidator {
    allow_plain: bool,
}

impl PkceValidator {
    /// Creates a validator. With `allow_plain = false` every `plain`
    /// validation fails.
    #[must_use]
    pub fn new(allow_plain: bool) -> Self {
        Self { allow_plain }
    }

    /// Whether `plain` challenges are accepted.
    #[must_use]
    pub fn allows_plain(&self) -> bool {
        self.allow_plain
    }

    /// Derives the challenge for `verifier` under `method`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any method other than `plain` or `S256`.
    pub fn generate_challenge(verifier: &str, method: &str) -> AuthResult<String> {
        let method: PkceMethod = method.parse()?;
        Ok(method.derive(verifier))
    }

    /// Checks `verifier` against a stored `challenge`.
    ///
    /// Unknown or disabled methods yield `false`. The final comparison is
    /// constant-time.
    #[must_use]
    pub fn validate(&self, verifier: &str, challenge: &str, method: &str) -> bool {
        let Some(method) = PkceMethod::parse(method) else {
            return false;
        };
        if method == PkceMethod::Plain && !self.allow_plain {
            return false;
        }
        let expected = method.derive(verifier);
        constant_time_eq(&expected, challenge)
    }

    /// Returns `true` if `verifier` is 43-128 characters from the unreserved
    /// set `[A-Za-z0-9-._~]`.
    #[must_use]
    pub fn is_well_formed_verifier(verifier: &str) -> bool {
        (MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&verifier.len())
            && verifier
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
    }

    /// Generates a random 43-character verifier.
    #[must_use]
    pub fn generate_verifier() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl Default for PkceValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_appendix_b() {
        let challenge = PkceValidator::generate_challenge(RFC_VERIFIER, "S256").unwrap();
        assert_eq!(challenge, RFC_CHALLENGE);
        assert!(PkceValidator::default().validate(RFC_VERIFIER, RFC_CHALLENGE, "S256"));
    }

    #[test]
    fn test_s256_is_sha256_of_verifier() {
        let challenge = PkceValidator::generate_challenge("some-verifier", "S256").unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(challenge).unwrap();
        assert_eq!(decoded, Sha256::digest(b"some-verifier").to_vec());
    }

    #[test]
    fn test_plain_returns_verifier() {
        assert_eq!(
            PkceValidator::generate_challenge("abc", "plain").unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_round_trip_both_methods() {
        let validator = PkceValidator::default();
        for _ in 0..8 {
            let verifier = PkceValidator::generate_verifier();
            for method in ["plain", "S256"] {
                let challenge = PkceValidator::generate_challenge(&verifier, method).unwrap();
                assert!(validator.validate(&verifier, &challenge, method), "{method}");
            }
        }
    }

    #[test]
    fn test_generate_unknown_method_errors() {
        let err = PkceValidator::generate_challenge(RFC_VERIFIER, "S512").unwrap_err();
        assert!(matches!(err, AuthError::InvalidArgument { .. }));
        assert!(PkceValidator::generate_challenge(RFC_VERIFIER, "s256").is_err());
    }

    #[test]
    fn test_validate_unknown_method_is_false() {
        let validator = PkceValidator::default();
        assert!(!validator.validate(RFC_VERIFIER, RFC_CHALLENGE, "S512"));
        assert!(!validator.validate(RFC_VERIFIER, RFC_VERIFIER, ""));
    }

    #[test]
    fn test_validate_wrong_verifier() {
        let validator = PkceValidator::default();
        let other = PkceValidator::generate_verifier();
        assert!(!validator.validate(&other, RFC_CHALLENGE, "S256"));
        assert!(!validator.validate(RFC_VERIFIER, "", "S256"));
    }

    #[test]
    fn test_plain_disabled() {
        let validator = PkceValidator::new(false);
        assert!(!validator.allows_plain());
        assert!(!validator.validate("abc", "abc", "plain"));
        assert!(validator.validate(RFC_VERIFIER, RFC_CHALLENGE, "S256"));
    }

    #[test]
    fn test_verifier_format() {
        assert!(PkceValidator::is_well_formed_verifier(RFC_VERIFIER));
        assert!(PkceValidator::is_well_formed_verifier(&"a".repeat(43)));
        assert!(PkceValidator::is_well_formed_verifier(&"~._-".repeat(32)));
        assert!(!PkceValidator::is_well_formed_verifier(&"a".repeat(42)));
        assert!(!PkceValidator::is_well_formed_verifier(&"a".repeat(129)));
        assert!(!PkceValidator::is_well_formed_verifier(&format!(
            "{}+",
            "a".repeat(42)
        )));
        assert_eq!(PkceValidator::generate_verifier().len(), 43);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(PkceMethod::parse("S256"), Some(PkceMethod::S256));
        assert_eq!(PkceMethod::parse("plain"), Some(PkceMethod::Plain));
        assert_eq!(PkceMethod::parse("PLAIN"), None);
        assert_eq!("S256".parse::<PkceMethod>().unwrap().to_string(), "S256");
    }
}
