//! CLI error types and exit codes

use thiserror::Error;
use xavyo_directory::DirectoryError;
use xavyo_exchange_rbac::GrantError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Directory service error
/// - 2: Invalid input or configuration
/// - 3: Required directory object not found
/// - 4: RBAC container not readable
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient permissions to access the RBAC container: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Directory(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Directory(_) => 1,
            CliError::Validation(_) | CliError::Config(_) => 2,
            CliError::NotFound(_) => 3,
            CliError::AccessDenied(_) => 4,
        }
    }

    /// Print the error to stderr with formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::AccessDenied(_) => Some(
                "Bind as an account that can read the Exchange configuration (--bind-dn / EXRBAC_BIND_DN).",
            ),
            CliError::Directory(_) => {
                Some("Check the domain controller address, port and TLS settings.")
            }
            CliError::NotFound(_) => {
                Some("Verify the domain name and that Exchange is installed in the forest.")
            }
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::InvalidConfiguration { message } => CliError::Config(message),
            other => CliError::Directory(other.to_string()),
        }
    }
}

impl From<GrantError> for CliError {
    fn from(e: GrantError) -> Self {
        match e {
            GrantError::InvalidInput { message } => CliError::Validation(message),
            GrantError::NotFound { what } => CliError::NotFound(what),
            GrantError::AccessDenied { dn } => CliError::AccessDenied(dn),
            GrantError::Directory(inner) => inner.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_directory_error() {
        assert_eq!(CliError::Directory("test".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_invalid_input() {
        assert_eq!(CliError::Validation("test".to_string()).exit_code(), 2);
        assert_eq!(CliError::Config("test".to_string()).exit_code(), 2);
    }

    #[test]
    fn test_exit_code_not_found() {
        assert_eq!(CliError::NotFound("test".to_string()).exit_code(), 3);
    }

    #[test]
    fn test_exit_code_access_denied() {
        assert_eq!(CliError::AccessDenied("test".to_string()).exit_code(), 4);
    }

    #[test]
    fn test_from_grant_error() {
        let e: CliError = GrantError::not_found("organization container").into();
        assert!(matches!(e, CliError::NotFound(ref what) if what == "organization container"));

        let e: CliError = GrantError::AccessDenied {
            dn: "CN=RBAC,CN=Org".to_string(),
        }
        .into();
        assert_eq!(e.exit_code(), 4);

        let e: CliError = GrantError::invalid_input("domain name is empty").into();
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn test_from_wrapped_directory_error() {
        let e: CliError = GrantError::from(DirectoryError::service("connection reset")).into();
        assert_eq!(e.exit_code(), 1);
        assert!(e.to_string().contains("connection reset"));

        let e: CliError = GrantError::from(DirectoryError::not_found("CN=Exchange Servers")).into();
        assert_eq!(e.exit_code(), 1);
    }

    #[test]
    fn test_from_invalid_configuration() {
        let e: CliError = DirectoryError::invalid_configuration("host is empty").into();
        assert!(matches!(e, CliError::Config(_)));
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn test_error_display_access_denied() {
        let error = CliError::AccessDenied("CN=RBAC".to_string());
        assert!(error.to_string().contains("Insufficient permissions"));
    }
}
