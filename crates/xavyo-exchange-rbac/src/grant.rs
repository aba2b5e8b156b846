//! End-to-end role grant: resolve every prerequisite, then upsert.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use xavyo_directory::DirectoryAdapter;

use crate::dn::{build_base_dn, configuration_dn, role_assignment_cn, RbacPaths};
use crate::error::{GrantError, GrantResult};
use crate::probe::can_read;
use crate::resolve::{find_organization_container, find_principal, find_version_marker};
use crate::upsert::{upsert_role_assignment, RoleAssignment, UpsertOutcome};

/// Role granted when none is specified.
pub const DEFAULT_ROLE: &str = "ApplicationImpersonation";

/// What to grant, to whom, in which domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    /// Dotted DNS domain name, e.g. `corp.example.com`.
    pub domain: String,
    /// Logon name (`sAMAccountName`) of the principal.
    pub principal: String,
    /// Name of the RBAC role to grant.
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl GrantRequest {
    /// Request the default role for `principal` in `domain`.
    pub fn new(domain: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            principal: principal.into(),
            role: default_role(),
        }
    }

    /// Grant a different role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// Every DN a successful grant resolved, plus the upsert outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReport {
    pub base_dn: String,
    pub organization_dn: String,
    pub role_dn: String,
    pub role_assignments_dn: String,
    pub principal_dn: String,
    pub outcome: UpsertOutcome,
}

/// Grant `request.role` to `request.principal`.
///
/// Stops before any write if the organization container, RBAC access, the
/// principal or the version marker cannot be resolved.
#[instrument(skip(directory), fields(domain = %request.domain, principal = %request.principal))]
pub async fn grant_role(
    directory: &dyn DirectoryAdapter,
    request: &GrantRequest,
) -> GrantResult<GrantReport> {
    if request.principal.trim().is_empty() {
        return Err(GrantError::invalid_input("principal logon name is empty"));
    }
    if request.role.trim().is_empty() {
        return Err(GrantError::invalid_input("role name is empty"));
    }

    let base_dn = build_base_dn(&request.domain)?;
    let config_dn = configuration_dn(&base_dn);

    let organization = find_organization_container(directory, &config_dn)
        .await?
        .ok_or_else(|| GrantError::not_found("organization container"))?;

    let paths = RbacPaths::new(&organization.dn);
    if !can_read(directory, &paths.rbac).await? {
        warn!(rbac_dn = %paths.rbac, "Insufficient permissions to access the RBAC container");
        return Err(GrantError::AccessDenied { dn: paths.rbac });
    }

    let role_dn = paths.role_dn(&request.role);

    info!(
        base_dn = %base_dn,
        role_dn = %role_dn,
        role_assignments_dn = %paths.role_assignments,
        "Resolved RBAC paths"
    );

    let principal_dn = find_principal(directory, &base_dn, &request.principal)
        .await?
        .ok_or_else(|| GrantError::not_found(format!("principal '{}'", request.principal)))?;

    info!(principal_dn = %principal_dn, "Principal DN found");

    let version = find_version_marker(directory, &base_dn)
        .await?
        .ok_or_else(|| GrantError::not_found("msExchVersion on the Exchange Servers group"))?;

    let cn = role_assignment_cn(&request.role, &request.principal);
    info!(role_assignment_dn = %paths.role_assignment_dn(&cn), "Role assignment target");

    let assignment = RoleAssignment {
        cn,
        principal_dn: principal_dn.clone(),
        role_dn: role_dn.clone(),
        version,
    };
    let outcome = upsert_role_assignment(directory, &paths.role_assignments, &assignment).await?;

    Ok(GrantReport {
        base_dn,
        organization_dn: organization.dn,
        role_dn,
        role_assignments_dn: paths.role_assignments,
        principal_dn,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_application_impersonation() {
        let request = GrantRequest::new("corp.example.com", "jdoe");
        assert_eq!(request.role, "ApplicationImpersonation");

        let request = request.with_role("Mailbox Search");
        assert_eq!(request.role, "Mailbox Search");
    }

    #[test]
    fn test_request_deserialize_default_role() {
        let request: GrantRequest =
            serde_json::from_str(r#"{"domain":"corp.example.com","principal":"jdoe"}"#).unwrap();
        assert_eq!(request.role, DEFAULT_ROLE);
    }
}
