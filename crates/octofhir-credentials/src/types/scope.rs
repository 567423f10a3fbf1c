//! OAuth 2.0 scope sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// An ordered, de-duplicated set of scope tokens.
///
/// Parsed from and rendered to the space-delimited `scope` parameter of
/// RFC 6749 §3.3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a space-delimited scope string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` if a token contains characters outside the
    /// RFC 6749 `scope-token` grammar (`%x21 / %x23-5B / %x5D-7E`).
    pub fn parse(scope: &str) -> AuthResult<Self> {
        let mut set = BTreeSet::new();
        for token in scope.split(' ').filter(|t| !t.is_empty()) {
            if !token.bytes().all(is_scope_char) {
                return Err(AuthError::invalid_scope(format!(
                    "malformed scope token '{token}'"
                )));
            }
            set.insert(token.to_string());
        }
        Ok(Self(set))
    }

    /// Returns `true` if no scopes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the scope is present.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Returns `true` if every scope in `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &ScopeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Scopes in `self` that are missing from `other`.
    #[must_use]
    pub fn difference(&self, other: &ScopeSet) -> ScopeSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    /// Iterates scopes in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the scopes as owned strings.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

fn is_scope_char(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E)
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let scopes = ScopeSet::parse("write  read read").unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes.to_string(), "read write");
    }

    #[test]
    fn test_parse_empty() {
        let scopes = ScopeSet::parse("").unwrap();
        assert!(scopes.is_empty());
        assert_eq!(scopes.to_string(), "");
    }

    #[test]
    fn test_parse_rejects_malformed_token() {
        let err = ScopeSet::parse("read \"write\"").unwrap_err();
        assert!(matches!(err, AuthError::InvalidScope { .. }));
    }

    #[test]
    fn test_subset() {
        let granted = ScopeSet::parse("read write admin").unwrap();
        let narrow = ScopeSet::parse("read").unwrap();
        let broad = ScopeSet::parse("read delete").unwrap();

        assert!(narrow.is_subset(&granted));
        assert!(!broad.is_subset(&granted));
        assert_eq!(broad.difference(&granted).to_string(), "delete");
    }

    #[test]
    fn test_serde_as_array() {
        let scopes: ScopeSet = ["write", "read"].into_iter().collect();
        let json = serde_json::to_string(&scopes).unwrap();
        assert_eq!(json, r#"["read","write"]"#);
        let back: ScopeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scopes);
    }
}
