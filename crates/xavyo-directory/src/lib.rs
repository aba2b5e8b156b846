//! # Directory Adapter
//!
//! Narrow, DN-addressed access to an LDAP/Active Directory service.
//!
//! This crate provides the [`DirectoryAdapter`] trait that higher-level
//! provisioning logic calls through, plus:
//!
//! - [`LdapDirectory`]: `ldap3`-backed adapter with one connection per operation
//! - `InMemoryDirectory`: ordered in-memory tree for tests (feature `test-support`)
//! - [`DirectoryError`]: the closed set of outcomes (`AccessDenied`, `NotFound`,
//!   `Service`) every provider failure is mapped into
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_directory::{DirectoryAdapter, DirectoryConfig, LdapDirectory};
//!
//! let config = DirectoryConfig::new("dc01.corp.example.com")
//!     .with_credentials("svc-exchange@corp.example.com", "secret")
//!     .with_ssl();
//!
//! let directory = LdapDirectory::new(config)?;
//! let handle = directory.bind("CN=Users,DC=corp,DC=example,DC=com").await?;
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod ldap;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod record;

// Re-exports
pub use adapter::DirectoryAdapter;
pub use config::DirectoryConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::LdapDirectory;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryDirectory;
pub use record::{AttributeValue, DirectoryRecord, HandleState, ObjectHandle};
