//! Directory adapter trait
//!
//! The narrow interface the role-assignment engine calls through. Every
//! operation either returns a value or a [`DirectoryError`]; there are no
//! retries at this layer.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::record::{DirectoryRecord, ObjectHandle};

/// Access to a hierarchical, DN-addressed directory.
#[async_trait]
pub trait DirectoryAdapter: Send + Sync {
    /// Bind to the object at `dn`, loading its attributes.
    ///
    /// Returns [`DirectoryError::NotFound`] when the object does not exist and
    /// [`DirectoryError::AccessDenied`] when the caller may not read it.
    ///
    /// [`DirectoryError::NotFound`]: crate::error::DirectoryError::NotFound
    /// [`DirectoryError::AccessDenied`]: crate::error::DirectoryError::AccessDenied
    async fn bind(&self, dn: &str) -> DirectoryResult<ObjectHandle>;

    /// Search the subtree rooted at `base_dn` and return at most one match.
    ///
    /// `filter` is passed to the provider verbatim. When several objects
    /// match, which one is returned is provider-defined.
    async fn search_one(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryRecord>>;

    /// List the immediate children of `base_dn` in provider order.
    async fn enumerate_children(&self, base_dn: &str) -> DirectoryResult<Vec<DirectoryRecord>>;

    /// Prepare a new child object under `parent_dn`. Nothing is written until
    /// [`DirectoryAdapter::commit`].
    async fn create_child(
        &self,
        parent_dn: &str,
        cn: &str,
        object_class: &str,
    ) -> DirectoryResult<ObjectHandle> {
        Ok(ObjectHandle::pending(parent_dn, cn, object_class))
    }

    /// Write all staged attribute changes of `handle` as one operation.
    async fn commit(&self, handle: &mut ObjectHandle) -> DirectoryResult<()>;
}
