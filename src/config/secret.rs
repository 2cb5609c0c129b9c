//! Secure credential handling using the secrecy crate
//!
//! Database connection strings and storage keys are held as [`SecretString`]:
//! zeroized on drop, redacted in `Debug` output, and only readable through
//! `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use sluice::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let url = secret_string("postgresql://user:pass@db/shop".to_string());
//! assert!(url.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{url:?}").contains("pass"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the secret value starts with a prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }

    /// Connection URL with everything before `@` masked
    pub fn redacted_url(&self) -> String {
        match self.0.rsplit_once('@') {
            Some((head, host)) => {
                let scheme = head.split_once("://").map(|(s, _)| s).unwrap_or("postgresql");
                format!("{scheme}://***@{host}")
            }
            None => "***".to_string(),
        }
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Helper function to create an optional SecretString from an optional String
#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(|s| Secret::new(SecretValue::from(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("test-password".to_string());
        assert_eq!(secret.expose_secret(), "test-password");
    }

    #[test]
    fn test_secret_string_opt() {
        assert!(secret_string_opt(Some("x".to_string())).is_some());
        assert!(secret_string_opt(None).is_none());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("sensitive-data"));
    }

    #[test]
    fn test_redacted_url() {
        let secret = secret_string("postgresql://user:pw@db.internal:5432/shop".to_string());
        assert_eq!(
            secret.expose_secret().redacted_url(),
            "postgresql://***@db.internal:5432/shop"
        );
        let no_host = secret_string("not a url".to_string());
        assert_eq!(no_host.expose_secret().redacted_url(), "***");
    }

    #[test]
    fn test_secret_toml_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct TestConfig {
            password: SecretString,
        }

        let parsed: TestConfig = toml::from_str("password = \"test123\"").unwrap();
        assert_eq!(parsed.password.expose_secret(), "test123");
    }
}
