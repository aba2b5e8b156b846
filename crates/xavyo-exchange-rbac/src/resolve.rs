//! Resolution of the directory objects a role grant depends on.
//!
//! Each resolver returns `Ok(None)` when the thing it looks for is absent and
//! an error when the directory itself fails.

use tracing::{debug, info, instrument};
use xavyo_directory::{AttributeValue, DirectoryAdapter};

use crate::dn::exchange_servers_dn;
use crate::error::GrantResult;

/// Object class of the Exchange organization container.
pub const ORGANIZATION_CONTAINER_CLASS: &str = "msExchOrganizationContainer";

/// Logon-name attribute used to look up principals.
pub const LOGON_NAME_ATTRIBUTE: &str = "sAMAccountName";

/// Attribute carrying the Exchange object version.
pub const VERSION_ATTRIBUTE: &str = "msExchVersion";

const DISTINGUISHED_NAME_ATTRIBUTE: &str = "distinguishedName";

/// A resolved directory object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryObjectRef {
    /// Distinguished name.
    pub dn: String,
    /// Most specific object class.
    pub object_class: String,
}

/// Opaque Exchange version value, copied between objects without being parsed.
#[derive(Clone, PartialEq, Eq)]
pub struct VersionMarker(Vec<u8>);

impl VersionMarker {
    /// Wrap raw attribute bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Attribute value that writes the bytes back unchanged.
    pub fn to_attribute_value(&self) -> AttributeValue {
        AttributeValue::Binary(self.0.clone())
    }
}

impl std::fmt::Debug for VersionMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VersionMarker")
            .field(&String::from_utf8_lossy(&self.0))
            .finish()
    }
}

/// Find the Exchange organization container among the immediate children of
/// the configuration container.
///
/// If several children match, the first one in provider order wins.
#[instrument(skip(directory))]
pub async fn find_organization_container(
    directory: &dyn DirectoryAdapter,
    configuration_dn: &str,
) -> GrantResult<Option<DirectoryObjectRef>> {
    let children = directory.enumerate_children(configuration_dn).await?;

    debug!(child_count = children.len(), "Enumerated configuration container");

    let organization = children.into_iter().find_map(|child| {
        child
            .object_class()
            .filter(|class| class == ORGANIZATION_CONTAINER_CLASS)
            .map(|object_class| DirectoryObjectRef {
                dn: child.dn,
                object_class,
            })
    });

    if let Some(ref org) = organization {
        info!(organization_dn = %org.dn, "Found organization container");
    }

    Ok(organization)
}

/// Find a principal's DN by logon name, searching the subtree at `search_root`.
///
/// The logon name is interpolated into the filter unescaped. Callers must
/// not pass names containing filter metacharacters (`*`, `(`, `)`, `\`, NUL).
#[instrument(skip(directory))]
pub async fn find_principal(
    directory: &dyn DirectoryAdapter,
    search_root: &str,
    logon_name: &str,
) -> GrantResult<Option<String>> {
    let filter = format!("({LOGON_NAME_ATTRIBUTE}={logon_name})");

    debug!(filter = %filter, "Executing principal search");

    let record = directory
        .search_one(search_root, &filter, &[DISTINGUISHED_NAME_ATTRIBUTE])
        .await?;

    Ok(record.map(|record| {
        record
            .first_string(DISTINGUISHED_NAME_ATTRIBUTE)
            .unwrap_or(record.dn)
    }))
}

/// Read the version marker from the Exchange Servers security group.
///
/// Returns `Ok(None)` when the group exists but has no version attribute.
/// A missing or unreadable group is a directory error.
#[instrument(skip(directory))]
pub async fn find_version_marker(
    directory: &dyn DirectoryAdapter,
    base_dn: &str,
) -> GrantResult<Option<VersionMarker>> {
    let group_dn = exchange_servers_dn(base_dn);
    let handle = directory.bind(&group_dn).await?;

    let marker = handle
        .record()
        .first_value(VERSION_ATTRIBUTE)
        .map(VersionMarker::new);

    debug!(group_dn = %group_dn, found = marker.is_some(), "Read version marker");

    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrantError;
    use xavyo_directory::{DirectoryError, DirectoryRecord, InMemoryDirectory};

    const BASE: &str = "DC=corp,DC=example,DC=com";
    const CONFIG: &str =
        "CN=Microsoft Exchange,CN=Services,CN=Configuration,DC=corp,DC=example,DC=com";
    const GROUP: &str =
        "CN=Exchange Servers,OU=Microsoft Exchange Security Groups,DC=corp,DC=example,DC=com";

    #[tokio::test]
    async fn test_organization_container_first_match() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(CONFIG, "msExchConfigurationContainer");
        directory.insert_object(&format!("CN=Address Lists,{CONFIG}"), "A");
        directory.insert_object(
            &format!("CN=First Organization,{CONFIG}"),
            ORGANIZATION_CONTAINER_CLASS,
        );
        directory.insert_object(&format!("CN=Global Settings,{CONFIG}"), "B");

        let org = find_organization_container(&directory, CONFIG)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(org.dn, format!("CN=First Organization,{CONFIG}"));
        assert_eq!(org.object_class, ORGANIZATION_CONTAINER_CLASS);
    }

    #[tokio::test]
    async fn test_organization_container_first_of_several() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(CONFIG, "msExchConfigurationContainer");
        directory.insert_object(&format!("CN=Org One,{CONFIG}"), ORGANIZATION_CONTAINER_CLASS);
        directory.insert_object(&format!("CN=Org Two,{CONFIG}"), ORGANIZATION_CONTAINER_CLASS);

        let org = find_organization_container(&directory, CONFIG)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(org.dn, format!("CN=Org One,{CONFIG}"));
    }

    #[tokio::test]
    async fn test_organization_container_no_match() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(CONFIG, "msExchConfigurationContainer");
        directory.insert_object(&format!("CN=Address Lists,{CONFIG}"), "A");

        let org = find_organization_container(&directory, CONFIG).await.unwrap();
        assert!(org.is_none());
    }

    #[tokio::test]
    async fn test_organization_container_ignores_grandchildren() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(CONFIG, "msExchConfigurationContainer");
        directory.insert_object(&format!("CN=Nested,{CONFIG}"), "container");
        directory.insert_object(
            &format!("CN=Deep Org,CN=Nested,{CONFIG}"),
            ORGANIZATION_CONTAINER_CLASS,
        );

        let org = find_organization_container(&directory, CONFIG).await.unwrap();
        assert!(org.is_none());
    }

    #[tokio::test]
    async fn test_principal_exact_match() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(BASE, "domainDNS");
        directory.insert(
            DirectoryRecord::new(format!("CN=John Doe,CN=Users,{BASE}"))
                .with_value("objectClass", "user")
                .with_value(LOGON_NAME_ATTRIBUTE, "jdoe")
                .with_value("distinguishedName", format!("CN=John Doe,CN=Users,{BASE}")),
        );

        let dn = find_principal(&directory, BASE, "jdoe").await.unwrap();
        assert_eq!(dn, Some(format!("CN=John Doe,CN=Users,{BASE}")));
    }

    #[tokio::test]
    async fn test_principal_falls_back_to_entry_dn() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(BASE, "domainDNS");
        directory.insert(
            DirectoryRecord::new(format!("CN=svc,{BASE}")).with_value(LOGON_NAME_ATTRIBUTE, "svc"),
        );

        let dn = find_principal(&directory, BASE, "svc").await.unwrap();
        assert_eq!(dn, Some(format!("CN=svc,{BASE}")));
    }

    #[tokio::test]
    async fn test_principal_not_found() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(BASE, "domainDNS");

        let dn = find_principal(&directory, BASE, "nobody").await.unwrap();
        assert!(dn.is_none());
    }

    #[tokio::test]
    async fn test_principal_multiple_matches_do_not_fail() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(BASE, "domainDNS");
        for ou in ["OU=A", "OU=B"] {
            directory.insert(
                DirectoryRecord::new(format!("CN=dup,{ou},{BASE}"))
                    .with_value(LOGON_NAME_ATTRIBUTE, "dup"),
            );
        }

        let dn = find_principal(&directory, BASE, "dup").await.unwrap();
        assert!(dn.is_some());
    }

    #[tokio::test]
    async fn test_principal_directory_error() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(BASE, "domainDNS");
        directory.fail_on(BASE);

        assert!(matches!(
            find_principal(&directory, BASE, "jdoe").await,
            Err(GrantError::Directory(_))
        ));
    }

    #[tokio::test]
    async fn test_version_marker_present() {
        let directory = InMemoryDirectory::new();
        directory.insert(
            DirectoryRecord::new(GROUP)
                .with_value("objectClass", "group")
                .with_value(VERSION_ATTRIBUTE, "44220983382016"),
        );

        let marker = find_version_marker(&directory, BASE).await.unwrap().unwrap();
        assert_eq!(marker.as_bytes(), b"44220983382016");
        assert_eq!(
            marker.to_attribute_value(),
            AttributeValue::Binary(b"44220983382016".to_vec())
        );
    }

    #[tokio::test]
    async fn test_version_marker_attribute_missing_is_none() {
        let directory = InMemoryDirectory::new();
        directory.insert_object(GROUP, "group");

        let marker = find_version_marker(&directory, BASE).await.unwrap();
        assert!(marker.is_none());
    }

    #[tokio::test]
    async fn test_version_marker_group_missing_is_fatal() {
        let directory = InMemoryDirectory::new();

        assert!(matches!(
            find_version_marker(&directory, BASE).await,
            Err(GrantError::Directory(DirectoryError::NotFound { .. }))
        ));
    }
}
