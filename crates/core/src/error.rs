//! Error types for stratamap
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors returned by a key's [`Storable`](crate::Storable) capability are
//! passed back to the caller exactly as the capability produced them.

use thiserror::Error;

/// Result type alias for stratamap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stratamap
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Structural mutation attempted on a frozen object
    #[error("can't modify frozen {type_name}")]
    Frozen {
        /// Type name of the frozen receiver ("Table", "String")
        type_name: &'static str,
    },

    /// A new key was stored while the table was being enumerated
    #[error("can't add a new key into table during iteration")]
    NewKeyDuringIteration,

    /// Rehash attempted while enumerating
    #[error("rehash during iteration")]
    RehashDuringIteration,

    /// Switch to identity comparison attempted while enumerating
    #[error("compare_by_identity during iteration")]
    CompareByIdentityDuringIteration,

    /// Clear attempted while enumerating
    #[error("can't clear table during iteration")]
    ClearDuringIteration,

    /// Key not found by `fetch`
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A user-supplied hash or equality capability failed
    #[error("capability error: {0}")]
    Capability(String),

    /// Invalid configuration value
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Frozen-receiver error for the given type name
    pub fn frozen(type_name: &'static str) -> Self {
        Error::Frozen { type_name }
    }

    /// Failure raised from inside a user capability
    pub fn capability(msg: impl Into<String>) -> Self {
        Error::Capability(msg.into())
    }

    /// Configuration rejected during parsing or validation
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Check if this is an immutability error
    pub fn is_frozen(&self) -> bool {
        matches!(self, Error::Frozen { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_frozen() {
        let err = Error::frozen("Table");
        let msg = err.to_string();
        assert!(msg.contains("frozen"));
        assert!(msg.contains("Table"));
        assert!(err.is_frozen());
    }

    #[test]
    fn test_error_display_new_key_during_iteration() {
        let msg = Error::NewKeyDuringIteration.to_string();
        assert!(msg.contains("during iteration"));
    }

    #[test]
    fn test_error_display_names_the_rejected_operation() {
        assert!(Error::RehashDuringIteration.to_string().starts_with("rehash"));
        let msg = Error::CompareByIdentityDuringIteration.to_string();
        assert!(msg.contains("compare_by_identity"));
        assert!(!msg.contains("rehash"));
    }

    #[test]
    fn test_error_display_capability() {
        let err = Error::capability("hash exploded");
        let msg = err.to_string();
        assert!(msg.contains("capability error"));
        assert!(msg.contains("hash exploded"));
        assert!(!err.is_frozen());
    }

    #[test]
    fn test_error_display_key_not_found() {
        let err = Error::KeyNotFound(":missing".to_string());
        assert!(err.to_string().contains(":missing"));
    }

    #[test]
    fn test_error_from_toml() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err: Error = parsed.unwrap_err().into();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::frozen("String");

        match err {
            Error::Frozen { type_name } => assert_eq!(type_name, "String"),
            _ => panic!("Wrong error variant"),
        }
    }
}
