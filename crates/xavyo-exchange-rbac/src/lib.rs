//! # Exchange RBAC role grant
//!
//! Grants an Exchange RBAC role (by default `ApplicationImpersonation`) to a
//! directory principal by creating or updating its role assignment object.
//!
//! The steps, each short-circuiting on failure:
//!
//! 1. Derive the domain base DN and Exchange configuration container ([`dn`])
//! 2. Find the organization container ([`resolve`])
//! 3. Check the RBAC container is readable ([`probe`])
//! 4. Resolve the principal DN and the Exchange version marker ([`resolve`])
//! 5. Upsert the role assignment ([`upsert`])
//!
//! All directory access goes through [`xavyo_directory::DirectoryAdapter`].
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_directory::{DirectoryConfig, LdapDirectory};
//! use xavyo_exchange_rbac::{grant_role, GrantRequest};
//!
//! let directory = LdapDirectory::new(DirectoryConfig::new("10.0.0.10"))?;
//! let report = grant_role(&directory, &GrantRequest::new("corp.example.com", "svc-ews")).await?;
//! println!("{}", report.outcome.dn);
//! ```

pub mod dn;
pub mod error;
pub mod grant;
pub mod probe;
pub mod resolve;
pub mod upsert;

// Re-exports
pub use dn::{build_base_dn, RbacPaths};
pub use error::{GrantError, GrantResult};
pub use grant::{grant_role, GrantReport, GrantRequest, DEFAULT_ROLE};
pub use probe::can_read;
pub use resolve::{
    find_organization_container, find_principal, find_version_marker, DirectoryObjectRef,
    VersionMarker,
};
pub use upsert::{pack_flags, upsert_role_assignment, RoleAssignment, UpsertAction, UpsertOutcome};
