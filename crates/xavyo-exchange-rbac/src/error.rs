//! Role grant error types

use thiserror::Error;
use xavyo_directory::DirectoryError;

/// Error that can occur while granting an Exchange RBAC role.
#[derive(Debug, Error)]
pub enum GrantError {
    /// Malformed input, e.g. an empty domain name.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A required object or value is absent.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The caller cannot read a required container.
    #[error("access denied: {dn}")]
    AccessDenied { dn: String },

    /// Any other directory failure, including during create, update or commit.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl GrantError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        GrantError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        GrantError::NotFound { what: what.into() }
    }

    /// Whether the run stopped on an unmet precondition rather than a failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GrantError::NotFound { .. } | GrantError::AccessDenied { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            GrantError::InvalidInput { .. } => "INVALID_INPUT",
            GrantError::NotFound { .. } => "NOT_FOUND",
            GrantError::AccessDenied { .. } => "ACCESS_DENIED",
            GrantError::Directory(_) => "DIRECTORY_SERVICE_ERROR",
        }
    }
}

/// Result type for role grant operations.
pub type GrantResult<T> = Result<T, GrantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors() {
        assert!(GrantError::not_found("organization container").is_precondition());
        assert!(GrantError::AccessDenied {
            dn: "CN=RBAC".to_string()
        }
        .is_precondition());
        assert!(!GrantError::invalid_input("empty domain").is_precondition());
        assert!(!GrantError::from(DirectoryError::service("boom")).is_precondition());
    }

    #[test]
    fn test_directory_errors_are_transparent() {
        let err = GrantError::from(DirectoryError::not_found("CN=Exchange Servers"));
        assert_eq!(err.error_code(), "DIRECTORY_SERVICE_ERROR");
        assert_eq!(err.to_string(), "object not found: CN=Exchange Servers");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            GrantError::not_found("principal 'jdoe'").to_string(),
            "principal 'jdoe' not found"
        );
        assert_eq!(
            GrantError::invalid_input("domain name is empty").to_string(),
            "invalid input: domain name is empty"
        );
    }
}
