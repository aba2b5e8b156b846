//! Read-access probe for directory containers.

use tracing::{debug, instrument, warn};
use xavyo_directory::DirectoryAdapter;

use crate::error::GrantResult;

/// Check whether the caller can read the object at `dn`.
///
/// Returns `Ok(false)` when the directory reports access denied or no such
/// object. AD answers "no such object" for containers the caller may not
/// read, so both are treated as a denial. Any other failure is returned.
#[instrument(skip(directory))]
pub async fn can_read(directory: &dyn DirectoryAdapter, dn: &str) -> GrantResult<bool> {
    match directory.bind(dn).await {
        Ok(handle) => {
            let object_class = handle.record().object_class().unwrap_or_default();
            debug!(object_class = %object_class, "Container is readable");
            Ok(true)
        }
        Err(e) if e.is_unreadable() => {
            warn!(error = %e, "Container is not readable");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
