//! In-memory directory adapter for testing.
//!
//! Entries are kept in insertion order so child enumeration is deterministic.
//! Read denial and service failures can be injected per DN.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::adapter::DirectoryAdapter;
use crate::error::{DirectoryError, DirectoryResult};
use crate::record::{DirectoryRecord, HandleState, ObjectHandle, OBJECT_CLASS_ATTRIBUTE};

/// In-memory implementation of [`DirectoryAdapter`] for testing.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<Vec<DirectoryRecord>>,
    // Lowercased DNs the caller may not read.
    denied: RwLock<HashSet<String>>,
    // Lowercased DNs whose operations fail with a service error.
    failing: RwLock<HashSet<String>>,
    commits: AtomicUsize,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is.
    pub fn insert(&self, record: DirectoryRecord) {
        self.entries.write().expect("lock poisoned").push(record);
    }

    /// Insert an object with the class hierarchy `top, <object_class>`.
    pub fn insert_object(&self, dn: &str, object_class: &str) {
        self.insert(
            DirectoryRecord::new(dn)
                .with_value(OBJECT_CLASS_ATTRIBUTE, "top")
                .with_value(OBJECT_CLASS_ATTRIBUTE, object_class)
                .with_value("distinguishedName", dn),
        );
    }

    /// Make `dn` unreadable: bind reports access denied and searches skip it.
    pub fn deny_read(&self, dn: &str) {
        self.denied
            .write()
            .expect("lock poisoned")
            .insert(dn.to_lowercase());
    }

    /// Make every operation addressed at `dn` fail with a service error.
    pub fn fail_on(&self, dn: &str) {
        self.failing
            .write()
            .expect("lock poisoned")
            .insert(dn.to_lowercase());
    }

    /// Get a copy of the entry at `dn` (for testing).
    pub fn get(&self, dn: &str) -> Option<DirectoryRecord> {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|entry| entry.dn.eq_ignore_ascii_case(dn))
            .cloned()
    }

    /// Immediate children of `dn`, in insertion order (for testing).
    pub fn children(&self, dn: &str) -> Vec<DirectoryRecord> {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|entry| parent_of(&entry.dn).is_some_and(|p| p.eq_ignore_ascii_case(dn)))
            .cloned()
            .collect()
    }

    /// Number of successful commits (for testing).
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Count of all entries (for testing).
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Whether the directory holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_fault(&self, dn: &str) -> DirectoryResult<()> {
        if self
            .failing
            .read()
            .expect("lock poisoned")
            .contains(&dn.to_lowercase())
        {
            return Err(DirectoryError::service(format!(
                "injected failure for {}",
                dn
            )));
        }
        Ok(())
    }

    fn is_denied(&self, dn: &str) -> bool {
        self.denied
            .read()
            .expect("lock poisoned")
            .contains(&dn.to_lowercase())
    }

    fn exists(&self, dn: &str) -> bool {
        self.get(dn).is_some()
    }
}

/// Parent DN: everything after the first component.
fn parent_of(dn: &str) -> Option<&str> {
    dn.split_once(',').map(|(_, parent)| parent)
}

fn in_subtree(dn: &str, base_dn: &str) -> bool {
    let dn = dn.to_lowercase();
    let base = base_dn.to_lowercase();
    dn == base || dn.ends_with(&format!(",{base}"))
}

/// Parse a single equality filter `(attribute=value)`.
fn parse_equality_filter(filter: &str) -> DirectoryResult<(&str, &str)> {
    filter
        .strip_prefix('(')
        .and_then(|f| f.strip_suffix(')'))
        .and_then(|f| f.split_once('='))
        .filter(|(attribute, _)| !attribute.is_empty())
        .ok_or_else(|| DirectoryError::service(format!("unsupported filter: {}", filter)))
}

fn project(record: &DirectoryRecord, attributes: &[&str]) -> DirectoryRecord {
    if attributes.is_empty() || attributes.contains(&"*") {
        return record.clone();
    }

    let mut projected = DirectoryRecord::new(record.dn.clone());
    for (name, values) in &record.attributes {
        if attributes.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            projected.attributes.insert(name.clone(), values.clone());
        }
    }
    projected
}

fn apply_changes(record: &mut DirectoryRecord, handle: &ObjectHandle) {
    for (name, value) in handle.changes() {
        let key = record
            .attributes
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.clone());
        record.attributes.insert(key, vec![value.to_ldap_bytes()]);
    }
}

#[async_trait]
impl DirectoryAdapter for InMemoryDirectory {
    async fn bind(&self, dn: &str) -> DirectoryResult<ObjectHandle> {
        self.check_fault(dn)?;

        if self.is_denied(dn) {
            return Err(DirectoryError::access_denied(dn));
        }

        self.get(dn)
            .map(ObjectHandle::existing)
            .ok_or_else(|| DirectoryError::not_found(dn))
    }

    async fn search_one(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryRecord>> {
        self.check_fault(base_dn)?;
        let (attribute, value) = parse_equality_filter(filter)?;

        if !self.exists(base_dn) {
            return Err(DirectoryError::not_found(base_dn));
        }

        let entries = self.entries.read().expect("lock poisoned");
        let found = entries
            .iter()
            .filter(|entry| in_subtree(&entry.dn, base_dn) && !self.is_denied(&entry.dn))
            .find(|entry| {
                entry.values(attribute).is_some_and(|values| {
                    values
                        .iter()
                        .any(|v| String::from_utf8_lossy(v).eq_ignore_ascii_case(value))
                })
            })
            .map(|entry| project(entry, attributes));

        Ok(found)
    }

    async fn enumerate_children(&self, base_dn: &str) -> DirectoryResult<Vec<DirectoryRecord>> {
        self.check_fault(base_dn)?;

        if !self.exists(base_dn) {
            return Err(DirectoryError::not_found(base_dn));
        }

        Ok(self
            .children(base_dn)
            .into_iter()
            .filter(|entry| !self.is_denied(&entry.dn))
            .collect())
    }

    async fn commit(&self, handle: &mut ObjectHandle) -> DirectoryResult<()> {
        let dn = handle.dn().to_string();
        self.check_fault(&dn)?;

        match handle.state() {
            HandleState::PendingCreate { cn, object_class } => {
                let parent = parent_of(&dn).unwrap_or_default();
                if !self.exists(parent) {
                    return Err(DirectoryError::not_found(parent));
                }
                if self.exists(&dn) {
                    return Err(DirectoryError::service(format!(
                        "Entry already exists: {}",
                        dn
                    )));
                }

                let mut record = DirectoryRecord::new(dn.clone())
                    .with_value(OBJECT_CLASS_ATTRIBUTE, "top")
                    .with_value(OBJECT_CLASS_ATTRIBUTE, object_class.as_str())
                    .with_value("cn", cn.as_str())
                    .with_value("distinguishedName", dn.as_str());
                apply_changes(&mut record, handle);
                self.insert(record);
            }
            HandleState::Existing => {
                let mut entries = self.entries.write().expect("lock poisoned");
                let record = entries
                    .iter_mut()
                    .find(|entry| entry.dn.eq_ignore_ascii_case(&dn))
                    .ok_or_else(|| DirectoryError::not_found(dn.clone()))?;
                apply_changes(record, handle);
            }
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        handle.mark_committed();
        Ok(())
    }
}
