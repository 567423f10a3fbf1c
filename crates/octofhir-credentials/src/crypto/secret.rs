//! Client secret generation and strength validation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;

use crate::error::{AuthError, AuthResult, SecretValidationError};

/// Minimum number of random bytes in a generated secret.
pub const MIN_SECRET_BYTES: usize = 32;

/// Minimum secret length in characters accepted by validation.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Minimum Shannon entropy in bits per character.
pub const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.5;

/// Keyboard rows and counting runs rejected anywhere in a secret.
const KEYBOARD_SEQUENCES: &[&str] = &[
    "qwerty", "qwertz", "azerty", "asdfgh", "zxcvbn", "yxcvbn", "123456", "654321", "abcdef",
    "fedcba", "098765",
];

/// Well-known weak words rejected as a prefix.
const WEAK_PREFIXES: &[&str] = &[
    "password", "passwd", "qwerty", "letmein", "changeme", "welcome", "secret", "admin",
];

/// Longest block size checked by the repeating-pattern rule.
const MAX_REPEAT_PERIOD: usize = 8;

/// Generates and scores client secrets.
///
/// ```
/// use octofhir_credentials::crypto::SecretEntropyValidator;
///
/// let validator = SecretEntropyValidator::new();
/// let secret = validator.generate(32).unwrap();
/// assert!(validator.validate(&secret).is_ok());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretEntropyValidator;

impl SecretEntropyValidator {
    /// Creates a validator with the standard thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generates `length` random bytes from the OS RNG, base64url-encoded
    /// without padding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `length` is below [`MIN_SECRET_BYTES`].
    pub fn generate(&self, length: usize) -> AuthResult<String> {
        if length < MIN_SECRET_BYTES {
            return Err(AuthError::invalid_argument(format!(
                "secret length must be at least {MIN_SECRET_BYTES} bytes, got {length}"
            )));
        }

        let mut bytes = vec![0u8; length];
        OsRng.fill_bytes(&mut bytes);
        Ok(URL_SAFE_NO_PAD.encode(&bytes))
    }

    /// Generates a secret of the default length.
    #[must_use]
    pub fn generate_default(&self) -> String {
        let mut bytes = [0u8; MIN_SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Checks a secret for length, low-diversity patterns and entropy.
    ///
    /// # Errors
    ///
    /// Returns the first rule the secret violates.
    pub fn validate(&self, secret: &str) -> Result<(), SecretValidationError> {
        let chars: Vec<char> = secret.chars().collect();

        if chars.len() < MIN_SECRET_LENGTH {
            return Err(SecretValidationError::TooShort {
                length: chars.len(),
                minimum: MIN_SECRET_LENGTH,
            });
        }

        if chars.iter().all(|c| *c == chars[0]) {
            return Err(SecretValidationError::RepeatedCharacter);
        }

        if is_monotonic_run(&chars) {
            return Err(SecretValidationError::Sequential);
        }

        let lowered = secret.to_lowercase();

        if let Some(sequence) = KEYBOARD_SEQUENCES
            .iter()
            .find(|seq| lowered.contains(**seq))
        {
            return Err(SecretValidationError::KeyboardPattern { sequence });
        }

        if let Some(prefix) = WEAK_PREFIXES.iter().find(|p| lowered.starts_with(**p)) {
            return Err(SecretValidationError::WeakPrefix { prefix });
        }

        if let Some(period) = repeating_period(&chars) {
            return Err(SecretValidationError::RepeatingPattern { period });
        }

        let bits_per_char = Self::calculate_entropy(secret);
        if bits_per_char < MIN_ENTROPY_BITS_PER_CHAR {
            return Err(SecretValidationError::LowEntropy {
                bits_per_char,
                minimum: MIN_ENTROPY_BITS_PER_CHAR,
            });
        }

        Ok(())
    }

    /// Shannon entropy of the character-frequency distribution, in bits
    /// per character. Empty input yields `0.0`.
    #[must_use]
    pub fn calculate_entropy(secret: &str) -> f64 {
        let mut counts: HashMap<char, usize> = HashMap::new();
        let mut total = 0usize;
        for c in secret.chars() {
            *counts.entry(c).or_insert(0) += 1;
            total += 1;
        }

        if total == 0 {
            return 0.0;
        }

        let total = total as f64;
        counts
            .values()
            .map(|&count| {
                let p = count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

/// Every step is +1, or every step is -1.
fn is_monotonic_run(chars: &[char]) -> bool {
    let steps: Vec<i64> = chars
        .windows(2)
        .map(|w| i64::from(u32::from(w[1])) - i64::from(u32::from(w[0])))
        .collect();
    steps.iter().all(|s| *s == 1) || steps.iter().all(|s| *s == -1)
}

/// Smallest block length (2..=8) that tiles the whole secret.
fn repeating_period(chars: &[char]) -> Option<usize> {
    (2..=MAX_REPEAT_PERIOD)
        .filter(|period| *period < chars.len())
        .find(|&period| (period..chars.len()).all(|i| chars[i] == chars[i - period]))
}
