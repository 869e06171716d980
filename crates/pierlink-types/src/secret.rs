//! Secret string wrapper for tokens and passwords.
//!
//! [`SecretString`] keeps credentials out of logs, `Debug` output and
//! serialized config dumps (`check-config` prints the resolved config).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string value that must not appear in logs or serialized output.
///
/// - `Debug` / `Display` print `[REDACTED]` (or nothing if empty)
/// - `Serialize` emits an empty string
/// - `Deserialize` accepts a plain string
/// - [`expose()`](SecretString::expose) returns the inner value
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap the given value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The actual secret. Only call where the value is sent to a backend.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return `self` when set, otherwise read the named environment variable.
    ///
    /// An empty `env_name` or an unset variable yields an empty secret.
    pub fn or_env(&self, env_name: &str) -> SecretString {
        if !self.0.is_empty() || env_name.is_empty() {
            return self.clone();
        }
        std::env::var(env_name)
            .map(SecretString)
            .unwrap_or_default()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "\"[REDACTED]\"")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_redact() {
        let s = SecretString::new("discord-bot-token");
        assert_eq!(format!("{s:?}"), "\"[REDACTED]\"");
        assert_eq!(format!("{s}"), "[REDACTED]");
        assert_eq!(format!("{}", SecretString::default()), "");
    }

    #[test]
    fn serialize_never_leaks() {
        let s = SecretString::new("discord-bot-token");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"\"");
    }

    #[test]
    fn deserialize_plain_string() {
        let s: SecretString = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s.expose(), "abc");
    }

    #[test]
    fn or_env_prefers_inline_value() {
        let s = SecretString::new("inline");
        assert_eq!(s.or_env("PIERLINK_TEST_UNUSED_VAR").expose(), "inline");
    }

    #[test]
    fn or_env_missing_variable_is_empty() {
        let s = SecretString::default();
        assert!(s.or_env("PIERLINK_TEST_SURELY_UNSET_VAR_91").is_empty());
        assert!(s.or_env("").is_empty());
    }
}
