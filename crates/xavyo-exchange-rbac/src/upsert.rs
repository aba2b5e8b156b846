//! Idempotent create-or-update of Exchange role assignment objects.
//!
//! Running the upsert twice with the same CN leaves one object whose
//! attributes hold the values of the latest run.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use xavyo_directory::{AttributeValue, DirectoryAdapter};

use crate::error::GrantResult;
use crate::resolve::{VersionMarker, VERSION_ATTRIBUTE};

/// Object class of role assignment objects.
pub const ROLE_ASSIGNMENT_CLASS: &str = "msExchRoleAssignment";

/// Attribute names written on every upsert.
pub mod attributes {
    pub const USER_LINK: &str = "msExchUserLink";
    pub const ROLE_LINK: &str = "msExchRoleLink";
    pub const FLAGS: &str = "msExchRoleAssignmentFlags";
    pub const VERSION: &str = super::VERSION_ATTRIBUTE;
    pub const SYSTEM_FLAGS: &str = "systemFlags";
}

/// High half of the role assignment flags.
pub const ROLE_ASSIGNMENT_FLAGS_HIGH: i32 = 0x8001_0000_u32 as i32;

/// Low half of the role assignment flags.
pub const ROLE_ASSIGNMENT_FLAGS_LOW: i32 = 0x0200_0002;

/// `systemFlags` value for role assignments (bit 30).
pub const ROLE_ASSIGNMENT_SYSTEM_FLAGS: i64 = 1_073_741_824;

/// Combine two 32-bit halves into one 64-bit value.
///
/// Each half is masked to 32 bits before widening, so a negative `high` is
/// never sign-extended into the result.
#[must_use]
pub const fn pack_flags(high: i32, low: i32) -> u64 {
    ((high as u32 as u64) << 32) | (low as u32 as u64)
}

/// The attributes a role assignment must carry.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    /// Common name of the assignment object.
    pub cn: String,
    /// DN of the principal the role is granted to.
    pub principal_dn: String,
    /// DN of the granted role.
    pub role_dn: String,
    /// Version copied from the Exchange Servers group.
    pub version: VersionMarker,
}

/// Which path the upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    /// A new object was created.
    Created,
    /// An existing object was overwritten.
    Updated,
}

/// Result of a role assignment upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// DN of the role assignment object.
    pub dn: String,
    /// Whether the object was created or updated.
    pub action: UpsertAction,
}

/// Create the role assignment under `container_dn`, or update it if an object
/// with the same CN already exists, then commit all attributes in one write.
///
/// A failed commit is returned as-is; the object may have been partly written.
#[instrument(skip(directory, assignment), fields(cn = %assignment.cn))]
pub async fn upsert_role_assignment(
    directory: &dyn DirectoryAdapter,
    container_dn: &str,
    assignment: &RoleAssignment,
) -> GrantResult<UpsertOutcome> {
    let filter = format!("(cn={})", assignment.cn);
    let existing = directory.search_one(container_dn, &filter, &["cn"]).await?;

    let (mut handle, action) = match existing {
        Some(record) => {
            info!(dn = %record.dn, "Role assignment already exists, updating");
            (directory.bind(&record.dn).await?, UpsertAction::Updated)
        }
        None => {
            info!(container_dn = %container_dn, "Creating new role assignment");
            (
                directory
                    .create_child(container_dn, &assignment.cn, ROLE_ASSIGNMENT_CLASS)
                    .await?,
                UpsertAction::Created,
            )
        }
    };

    handle.set_attribute(attributes::USER_LINK, assignment.principal_dn.as_str());
    handle.set_attribute(attributes::ROLE_LINK, assignment.role_dn.as_str());
    handle.set_attribute(
        attributes::FLAGS,
        AttributeValue::LargeInteger(pack_flags(
            ROLE_ASSIGNMENT_FLAGS_HIGH,
            ROLE_ASSIGNMENT_FLAGS_LOW,
        )),
    );
    handle.set_attribute(attributes::VERSION, assignment.version.to_attribute_value());
    handle.set_attribute(attributes::SYSTEM_FLAGS, ROLE_ASSIGNMENT_SYSTEM_FLAGS);

    debug!(dn = %handle.dn(), "Committing role assignment");
    directory.commit(&mut handle).await?;

    info!(dn = %handle.dn(), action = ?action, "Role assignment processed successfully");

    Ok(UpsertOutcome {
        dn: handle.dn().to_string(),
        action,
    })
}
