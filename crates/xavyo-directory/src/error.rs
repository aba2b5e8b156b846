//! Directory adapter error types
//!
//! A closed set of outcomes every adapter maps its provider failures into.

use thiserror::Error;

/// Error that can occur during a directory operation.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The caller is not allowed to read or write the object.
    #[error("access denied: {dn}")]
    AccessDenied { dn: String },

    /// The object does not exist (or is not visible to the caller).
    #[error("object not found: {dn}")]
    NotFound { dn: String },

    /// Any other provider failure: connection, bind, timeout, rejected write.
    #[error("directory service error: {message}")]
    Service {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Adapter configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl DirectoryError {
    /// Create an access denied error.
    pub fn access_denied(dn: impl Into<String>) -> Self {
        DirectoryError::AccessDenied { dn: dn.into() }
    }

    /// Create a not found error.
    pub fn not_found(dn: impl Into<String>) -> Self {
        DirectoryError::NotFound { dn: dn.into() }
    }

    /// Create a service error.
    pub fn service(message: impl Into<String>) -> Self {
        DirectoryError::Service {
            message: message.into(),
            source: None,
        }
    }

    /// Create a service error with source.
    pub fn service_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::Service {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Whether this error reports that the object could not be read,
    /// either because it is missing or because the caller lacks rights.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            DirectoryError::AccessDenied { .. } | DirectoryError::NotFound { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::AccessDenied { .. } => "ACCESS_DENIED",
            DirectoryError::NotFound { .. } => "NOT_FOUND",
            DirectoryError::Service { .. } => "DIRECTORY_SERVICE_ERROR",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_errors() {
        assert!(DirectoryError::access_denied("CN=RBAC,DC=corp").is_unreadable());
        assert!(DirectoryError::not_found("CN=RBAC,DC=corp").is_unreadable());
        assert!(!DirectoryError::service("timeout").is_unreadable());
        assert!(!DirectoryError::invalid_configuration("host").is_unreadable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DirectoryError::access_denied("x").error_code(),
            "ACCESS_DENIED"
        );
        assert_eq!(DirectoryError::not_found("x").error_code(), "NOT_FOUND");
        assert_eq!(
            DirectoryError::service("x").error_code(),
            "DIRECTORY_SERVICE_ERROR"
        );
        assert_eq!(
            DirectoryError::invalid_configuration("x").error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_error_display() {
        let err = DirectoryError::not_found("CN=Exchange Servers,DC=corp,DC=com");
        assert_eq!(
            err.to_string(),
            "object not found: CN=Exchange Servers,DC=corp,DC=com"
        );

        let err = DirectoryError::service("LDAP modify failed with code 19");
        assert_eq!(
            err.to_string(),
            "directory service error: LDAP modify failed with code 19"
        );
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed");
        let err = DirectoryError::service_with_source("search timed out", source_err);

        if let DirectoryError::Service { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected Service variant");
        }
    }
}
