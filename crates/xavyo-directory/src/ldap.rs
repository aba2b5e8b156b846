//! LDAP directory adapter
//!
//! Implements [`DirectoryAdapter`] over `ldap3`. Every operation opens its
//! own connection, binds, runs, and unbinds before returning, whether the
//! operation succeeded or not.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry, SearchOptions,
    SearchResult,
};
use tracing::{debug, info, instrument, warn};

use crate::adapter::DirectoryAdapter;
use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::record::{DirectoryRecord, HandleState, ObjectHandle, OBJECT_CLASS_ATTRIBUTE};

// LDAP result codes (RFC 4511).
const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_INSUFFICIENT_ACCESS: u32 = 50;
const RC_ALREADY_EXISTS: u32 = 68;

/// Directory adapter backed by an LDAP server (typically an AD domain controller).
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    /// Create a new LDAP directory adapter with the given configuration.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the adapter configuration.
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.operation_timeout_secs)
    }

    /// Connect and bind. The returned session must be passed to `close_session`.
    async fn open_session(&self) -> DirectoryResult<Ldap> {
        let url = self.config.url();

        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::service_with_source(
                    format!("Failed to connect to LDAP server at {}", url),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let Some(bind_dn) = self.config.bind_dn.as_deref() else {
            debug!("No bind DN configured, using anonymous bind");
            return Ok(ldap);
        };
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let bound = ldap
            .with_timeout(self.operation_timeout())
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                DirectoryError::service_with_source(format!("LDAP bind failed for {}", bind_dn), e)
            })
            .and_then(|result| check_result(&result, bind_dn, "bind"));

        if let Err(e) = bound {
            close_session(ldap).await;
            return Err(e);
        }

        Ok(ldap)
    }

    async fn read_object(&self, ldap: &mut Ldap, dn: &str) -> DirectoryResult<DirectoryRecord> {
        let SearchResult(entries, result) = ldap
            .with_timeout(self.operation_timeout())
            .search(dn, Scope::Base, "(objectClass=*)", vec!["*"])
            .await
            .map_err(|e| DirectoryError::service_with_source(format!("Failed to read {}", dn), e))?;

        check_result(&result, dn, "read")?;

        entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .map(entry_to_record)
            .ok_or_else(|| DirectoryError::not_found(dn))
    }

    async fn find_one(
        &self,
        ldap: &mut Ldap,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryRecord>> {
        let SearchResult(entries, result) = ldap
            .with_search_options(SearchOptions::new().sizelimit(1))
            .with_timeout(self.operation_timeout())
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(|e| DirectoryError::service_with_source("LDAP search failed", e))?;

        check_search_result(&result, base_dn)?;

        Ok(entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .map(entry_to_record))
    }

    async fn list_children(
        &self,
        ldap: &mut Ldap,
        base_dn: &str,
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        let SearchResult(entries, result) = ldap
            .with_timeout(self.operation_timeout())
            .search(
                base_dn,
                Scope::OneLevel,
                "(objectClass=*)",
                vec![OBJECT_CLASS_ATTRIBUTE, "distinguishedName", "cn"],
            )
            .await
            .map_err(|e| {
                DirectoryError::service_with_source(
                    format!("Failed to enumerate children of {}", base_dn),
                    e,
                )
            })?;

        check_result(&result, base_dn, "enumerate")?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(entry_to_record)
            .collect())
    }

    async fn write_changes(&self, ldap: &mut Ldap, handle: &ObjectHandle) -> DirectoryResult<()> {
        let dn = handle.dn();

        let result = match handle.state() {
            HandleState::PendingCreate { cn, object_class } => {
                let attrs = add_attributes(cn, object_class, handle);

                debug!(dn = %dn, object_class = %object_class, "Creating LDAP entry");

                ldap.with_timeout(self.operation_timeout())
                    .add(dn, attrs)
                    .await
                    .map_err(|e| {
                        DirectoryError::service_with_source(
                            format!("Failed to create entry: {}", dn),
                            e,
                        )
                    })?
            }
            HandleState::Existing => {
                let mods = replace_mods(handle);

                debug!(dn = %dn, modifications = mods.len(), "Updating LDAP entry");

                ldap.with_timeout(self.operation_timeout())
                    .modify(dn, mods)
                    .await
                    .map_err(|e| {
                        DirectoryError::service_with_source(
                            format!("Failed to update entry: {}", dn),
                            e,
                        )
                    })?
            }
        };

        if result.rc == RC_ALREADY_EXISTS {
            return Err(DirectoryError::service(format!(
                "Entry already exists: {}",
                dn
            )));
        }

        check_result(&result, dn, "write")
    }
}

/// Attribute set for an LDAP add: `objectClass`, `cn`, then every staged
/// change in name order.
fn add_attributes(
    cn: &str,
    object_class: &str,
    handle: &ObjectHandle,
) -> Vec<(Vec<u8>, HashSet<Vec<u8>>)> {
    let mut attrs = vec![
        (
            OBJECT_CLASS_ATTRIBUTE.as_bytes().to_vec(),
            HashSet::from([object_class.as_bytes().to_vec()]),
        ),
        (b"cn".to_vec(), HashSet::from([cn.as_bytes().to_vec()])),
    ];
    attrs.extend(handle.changes().iter().map(|(name, value)| {
        (
            name.as_bytes().to_vec(),
            HashSet::from([value.to_ldap_bytes()]),
        )
    }));
    attrs
}

/// One `Mod::Replace` per staged change.
fn replace_mods(handle: &ObjectHandle) -> Vec<Mod<Vec<u8>>> {
    handle
        .changes()
        .iter()
        .map(|(name, value)| {
            Mod::Replace(
                name.as_bytes().to_vec(),
                HashSet::from([value.to_ldap_bytes()]),
            )
        })
        .collect()
}

/// Result check for single-result searches. A size-limit-exceeded result
/// still carries the first entry the server sent, so it is accepted.
fn check_search_result(result: &LdapResult, base_dn: &str) -> DirectoryResult<()> {
    if result.rc == RC_SIZE_LIMIT_EXCEEDED {
        debug!(base_dn = %base_dn, "Search matched more than one entry, keeping the first");
        return Ok(());
    }
    check_result(result, base_dn, "search")
}

/// Unbind and drop the session. Unbind failures are logged, never returned.
async fn close_session(mut ldap: Ldap) {
    if let Err(e) = ldap.unbind().await {
        warn!(error = %e, "Error during LDAP unbind");
    }
}

/// Map an LDAP result code onto the adapter's error set.
fn check_result(result: &LdapResult, dn: &str, operation: &str) -> DirectoryResult<()> {
    match result.rc {
        RC_SUCCESS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::not_found(dn)),
        RC_INSUFFICIENT_ACCESS => Err(DirectoryError::access_denied(dn)),
        RC_INVALID_CREDENTIALS => Err(DirectoryError::service(format!(
            "LDAP {} rejected: invalid credentials",
            operation
        ))),
        rc => Err(DirectoryError::service(format!(
            "LDAP {} failed with code {}: {}",
            operation, rc, result.text
        ))),
    }
}

/// Convert an LDAP search entry to a record, keeping every value as bytes.
fn entry_to_record(entry: SearchEntry) -> DirectoryRecord {
    let mut record = DirectoryRecord::new(entry.dn);

    for (name, values) in entry.attrs {
        record.attributes.insert(
            name,
            values.into_iter().map(String::into_bytes).collect(),
        );
    }

    for (name, values) in entry.bin_attrs {
        record.attributes.entry(name).or_default().extend(values);
    }

    record
}

#[async_trait]
impl DirectoryAdapter for LdapDirectory {
    #[instrument(skip(self))]
    async fn bind(&self, dn: &str) -> DirectoryResult<ObjectHandle> {
        let mut ldap = self.open_session().await?;
        let result = self.read_object(&mut ldap, dn).await;
        close_session(ldap).await;

        result.map(ObjectHandle::existing)
    }

    #[instrument(skip(self))]
    async fn search_one(
        &self,
        base_dn: &str,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryRecord>> {
        let mut ldap = self.open_session().await?;
        let result = self.find_one(&mut ldap, base_dn, filter, attributes).await;
        close_session(ldap).await;

        debug!(
            found = result.as_ref().is_ok_and(Option::is_some),
            "LDAP search completed"
        );

        result
    }

    #[instrument(skip(self))]
    async fn enumerate_children(&self, base_dn: &str) -> DirectoryResult<Vec<DirectoryRecord>> {
        let mut ldap = self.open_session().await?;
        let result = self.list_children(&mut ldap, base_dn).await;
        close_session(ldap).await;

        result
    }

    #[instrument(skip(self, handle), fields(dn = %handle.dn()))]
    async fn commit(&self, handle: &mut ObjectHandle) -> DirectoryResult<()> {
        if !handle.is_pending_create() && handle.changes().is_empty() {
            return Ok(());
        }

        let mut ldap = self.open_session().await?;
        let result = self.write_changes(&mut ldap, handle).await;
        close_session(ldap).await;
        result?;

        info!(dn = %handle.dn(), "LDAP entry committed successfully");

        handle.mark_committed();
        Ok(())
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config.redacted())
            .finish()
    }
}
