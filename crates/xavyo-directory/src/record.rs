//! Directory records, attribute values and object handles
//!
//! Values read from the directory are kept as raw bytes so opaque attributes
//! can be copied between objects without interpretation.

use std::collections::{BTreeMap, HashMap};

/// Name of the attribute holding an object's class hierarchy.
pub const OBJECT_CLASS_ATTRIBUTE: &str = "objectClass";

/// An object returned by a search, enumeration or bind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Distinguished name of the object.
    pub dn: String,

    /// Attribute values as raw bytes, keyed by the name the provider returned.
    pub attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryRecord {
    /// Create an empty record for the given DN.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add a value to an attribute using builder pattern.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// All values of an attribute. Names match case-insensitively.
    pub fn values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// First raw value of an attribute.
    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        self.values(name)
            .and_then(|values| values.first())
            .map(Vec::as_slice)
    }

    /// First value of an attribute decoded as UTF-8.
    pub fn first_string(&self, name: &str) -> Option<String> {
        self.first_value(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Check if an attribute is present with at least one value.
    pub fn has(&self, name: &str) -> bool {
        self.values(name).is_some_and(|values| !values.is_empty())
    }

    /// The most specific object class (the last `objectClass` value).
    pub fn object_class(&self) -> Option<String> {
        self.values(OBJECT_CLASS_ATTRIBUTE)
            .and_then(|values| values.last())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// A value written to a directory attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// UTF-8 string (also used for DN-valued attributes).
    Text(String),
    /// Integer attribute.
    Integer(i64),
    /// 64-bit Large Integer. AD stores these as signed decimal strings.
    LargeInteger(u64),
    /// Raw bytes written unchanged.
    Binary(Vec<u8>),
}

impl AttributeValue {
    /// Encode the value the way LDAP transports it.
    pub fn to_ldap_bytes(&self) -> Vec<u8> {
        match self {
            AttributeValue::Text(s) => s.as_bytes().to_vec(),
            AttributeValue::Integer(i) => i.to_string().into_bytes(),
            // Reinterpret the bit pattern; AD Large Integer syntax is signed.
            AttributeValue::LargeInteger(v) => (*v as i64).to_string().into_bytes(),
            AttributeValue::Binary(b) => b.clone(),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        AttributeValue::Binary(b)
    }
}

/// Whether a handle refers to a stored object or one not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleState {
    /// The object exists in the directory.
    Existing,
    /// The object will be created on commit.
    PendingCreate { cn: String, object_class: String },
}

/// A bound directory object with staged attribute writes.
///
/// Writes are staged locally by [`ObjectHandle::set_attribute`] and sent as a
/// single operation by the adapter's `commit`.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    record: DirectoryRecord,
    state: HandleState,
    changes: BTreeMap<String, AttributeValue>,
}

impl ObjectHandle {
    /// Handle for an object loaded from the directory.
    pub fn existing(record: DirectoryRecord) -> Self {
        Self {
            record,
            state: HandleState::Existing,
            changes: BTreeMap::new(),
        }
    }

    /// Handle for a child object created on commit.
    pub fn pending(
        parent_dn: &str,
        cn: impl Into<String>,
        object_class: impl Into<String>,
    ) -> Self {
        let cn = cn.into();
        let dn = format!("CN={cn},{parent_dn}");
        Self {
            record: DirectoryRecord::new(dn),
            state: HandleState::PendingCreate {
                cn,
                object_class: object_class.into(),
            },
            changes: BTreeMap::new(),
        }
    }

    /// DN of the bound object.
    pub fn dn(&self) -> &str {
        &self.record.dn
    }

    /// Attributes loaded when the handle was bound.
    pub fn record(&self) -> &DirectoryRecord {
        &self.record
    }

    /// Current handle state.
    pub fn state(&self) -> &HandleState {
        &self.state
    }

    /// Whether commit will create the object.
    pub fn is_pending_create(&self) -> bool {
        matches!(self.state, HandleState::PendingCreate { .. })
    }

    /// Stage an attribute write. A later write to the same name replaces it.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.changes.insert(name.into(), value.into());
    }

    /// Staged writes, ordered by attribute name.
    pub fn changes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.changes
    }

    /// Mark staged writes as stored. Called by adapters after a successful commit.
    pub fn mark_committed(&mut self) {
        for (name, value) in std::mem::take(&mut self.changes) {
            let attribute_name = self
                .record
                .attributes
                .keys()
                .find(|key| key.eq_ignore_ascii_case(&name))
                .cloned()
                .unwrap_or(name);
            self.record
                .attributes
                .insert(attribute_name, vec![value.to_ldap_bytes()]);
        }
        self.state = HandleState::Existing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup_is_case_insensitive() {
        let record = DirectoryRecord::new("CN=jdoe,DC=corp,DC=com")
            .with_value("distinguishedName", "CN=jdoe,DC=corp,DC=com");

        assert_eq!(
            record.first_string("distinguishedname").as_deref(),
            Some("CN=jdoe,DC=corp,DC=com")
        );
        assert!(record.has("DISTINGUISHEDNAME"));
        assert!(!record.has("mail"));
    }

    #[test]
    fn test_object_class_is_most_specific_value() {
        let record = DirectoryRecord::new("CN=First Organization,CN=Microsoft Exchange")
            .with_value("objectClass", "top")
            .with_value("objectClass", "container")
            .with_value("objectClass", "msExchOrganizationContainer");

        assert_eq!(
            record.object_class().as_deref(),
            Some("msExchOrganizationContainer")
        );
        assert_eq!(DirectoryRecord::new("CN=x").object_class(), None);
    }

    #[test]
    fn test_large_integer_encodes_as_signed_decimal() {
        let value = AttributeValue::LargeInteger(0x8001_0000_0200_0002);
        assert_eq!(value.to_ldap_bytes(), b"-9223090561844510718".to_vec());

        let value = AttributeValue::LargeInteger(42);
        assert_eq!(value.to_ldap_bytes(), b"42".to_vec());
    }

    #[test]
    fn test_binary_value_is_unchanged() {
        let bytes = vec![0x00, 0xff, 0x10, 0x80];
        assert_eq!(AttributeValue::Binary(bytes.clone()).to_ldap_bytes(), bytes);
    }

    #[test]
    fn test_pending_handle_builds_child_dn() {
        let handle = ObjectHandle::pending(
            "CN=Role Assignments,CN=RBAC,CN=Org",
            "ApplicationImpersonation-jdoe",
            "msExchRoleAssignment",
        );

        assert_eq!(
            handle.dn(),
            "CN=ApplicationImpersonation-jdoe,CN=Role Assignments,CN=RBAC,CN=Org"
        );
        assert!(handle.is_pending_create());
    }

    #[test]
    fn test_set_attribute_last_write_wins() {
        let mut handle = ObjectHandle::existing(DirectoryRecord::new("CN=x"));
        handle.set_attribute("systemFlags", 1_i64);
        handle.set_attribute("systemFlags", 1_073_741_824_i64);

        assert_eq!(handle.changes().len(), 1);
        assert_eq!(
            handle.changes().get("systemFlags"),
            Some(&AttributeValue::Integer(1_073_741_824))
        );
    }

    #[test]
    fn test_mark_committed_applies_changes() {
        let mut handle = ObjectHandle::pending("CN=parent", "child", "container");
        handle.set_attribute("description", "hello");
        handle.mark_committed();

        assert!(!handle.is_pending_create());
        assert!(handle.changes().is_empty());
        assert_eq!(
            handle.record().first_string("description").as_deref(),
            Some("hello")
        );
    }
}
