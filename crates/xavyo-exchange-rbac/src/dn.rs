//! Distinguished name construction for Exchange RBAC objects.
//!
//! All paths are built by plain string composition. No escaping or
//! normalization is applied, so component values must not contain
//! unescaped `,` or `=`.

use crate::error::{GrantError, GrantResult};

/// Exchange configuration container, relative to the domain base DN.
pub const EXCHANGE_CONFIGURATION_PREFIX: &str =
    "CN=Microsoft Exchange,CN=Services,CN=Configuration";

/// Exchange Servers security group, relative to the domain base DN.
pub const EXCHANGE_SERVERS_PREFIX: &str =
    "CN=Exchange Servers,OU=Microsoft Exchange Security Groups";

/// Build the base DN for a dotted domain name.
///
/// `corp.example.com` becomes `DC=corp,DC=example,DC=com`.
///
/// # Errors
/// Returns [`GrantError::InvalidInput`] if the name is empty or has an empty
/// label (leading, trailing or doubled dot).
pub fn build_base_dn(domain_name: &str) -> GrantResult<String> {
    let domain_name = domain_name.trim();
    if domain_name.is_empty() {
        return Err(GrantError::invalid_input("domain name is empty"));
    }

    let labels: Vec<&str> = domain_name.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        return Err(GrantError::invalid_input(format!(
            "domain name '{}' has an empty label",
            domain_name
        )));
    }

    Ok(labels
        .iter()
        .map(|label| format!("DC={label}"))
        .collect::<Vec<_>>()
        .join(","))
}

/// `CN=Microsoft Exchange,CN=Services,CN=Configuration,<base>`
#[must_use]
pub fn configuration_dn(base_dn: &str) -> String {
    format!("{EXCHANGE_CONFIGURATION_PREFIX},{base_dn}")
}

/// `CN=Exchange Servers,OU=Microsoft Exchange Security Groups,<base>`
#[must_use]
pub fn exchange_servers_dn(base_dn: &str) -> String {
    format!("{EXCHANGE_SERVERS_PREFIX},{base_dn}")
}

/// CN of the role assignment linking `principal` to `role`.
#[must_use]
pub fn role_assignment_cn(role_name: &str, principal: &str) -> String {
    format!("{role_name}-{principal}")
}

/// Paths inside the RBAC container of one Exchange organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbacPaths {
    /// `CN=RBAC,<org-dn>`
    pub rbac: String,
    /// `CN=Roles,<rbac-dn>`
    pub roles: String,
    /// `CN=Role Assignments,<rbac-dn>`
    pub role_assignments: String,
}

impl RbacPaths {
    /// Derive the RBAC paths under an organization container.
    #[must_use]
    pub fn new(organization_dn: &str) -> Self {
        let rbac = format!("CN=RBAC,{organization_dn}");
        Self {
            roles: format!("CN=Roles,{rbac}"),
            role_assignments: format!("CN=Role Assignments,{rbac}"),
            rbac,
        }
    }

    /// DN of a role object.
    #[must_use]
    pub fn role_dn(&self, role_name: &str) -> String {
        format!("CN={role_name},{}", self.roles)
    }

    /// DN of a role assignment object with the given CN.
    #[must_use]
    pub fn role_assignment_dn(&self, cn: &str) -> String {
        format!("CN={cn},{}", self.role_assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: &str = "CN=First Organization,CN=Microsoft Exchange,CN=Services,CN=Configuration,DC=corp,DC=example,DC=com";

    #[test]
    fn test_build_base_dn() {
        assert_eq!(
            build_base_dn("corp.example.com").unwrap(),
            "DC=corp,DC=example,DC=com"
        );
        assert_eq!(build_base_dn("local").unwrap(), "DC=local");
    }

    #[test]
    fn test_build_base_dn_is_stable() {
        let first = build_base_dn("contoso.local").unwrap();
        let second = build_base_dn("contoso.local").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_base_dn_matches_labels() {
        for domain in ["a.b", "corp.example.com", "x.y.z.w", "single"] {
            let expected: Vec<String> = domain.split('.').map(|l| format!("DC={l}")).collect();
            assert_eq!(build_base_dn(domain).unwrap(), expected.join(","));
        }
    }

    #[test]
    fn test_build_base_dn_rejects_empty() {
        assert!(matches!(
            build_base_dn(""),
            Err(GrantError::InvalidInput { .. })
        ));
        assert!(matches!(
            build_base_dn("   "),
            Err(GrantError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_build_base_dn_rejects_empty_labels() {
        for domain in ["corp..com", ".corp.com", "corp.com."] {
            assert!(
                matches!(build_base_dn(domain), Err(GrantError::InvalidInput { .. })),
                "expected {domain} to be rejected"
            );
        }
    }

    #[test]
    fn test_well_known_paths() {
        let base = "DC=corp,DC=example,DC=com";
        assert_eq!(
            configuration_dn(base),
            "CN=Microsoft Exchange,CN=Services,CN=Configuration,DC=corp,DC=example,DC=com"
        );
        assert_eq!(
            exchange_servers_dn(base),
            "CN=Exchange Servers,OU=Microsoft Exchange Security Groups,DC=corp,DC=example,DC=com"
        );
    }

    #[test]
    fn test_rbac_paths() {
        let paths = RbacPaths::new(ORG);
        assert_eq!(paths.rbac, format!("CN=RBAC,{ORG}"));
        assert_eq!(paths.roles, format!("CN=Roles,CN=RBAC,{ORG}"));
        assert_eq!(
            paths.role_assignments,
            format!("CN=Role Assignments,CN=RBAC,{ORG}")
        );
        assert_eq!(
            paths.role_dn("ApplicationImpersonation"),
            format!("CN=ApplicationImpersonation,CN=Roles,CN=RBAC,{ORG}")
        );
    }

    #[test]
    fn test_role_assignment_naming() {
        let cn = role_assignment_cn("ApplicationImpersonation", "jdoe");
        assert_eq!(cn, "ApplicationImpersonation-jdoe");

        let paths = RbacPaths::new(ORG);
        assert_eq!(
            paths.role_assignment_dn(&cn),
            format!("CN=ApplicationImpersonation-jdoe,CN=Role Assignments,CN=RBAC,{ORG}")
        );
    }
}
