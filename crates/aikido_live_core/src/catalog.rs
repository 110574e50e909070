//! crates/aikido_live_core/src/catalog.rs
//!
//! Discovers which database/container pair holds the application's documents.
//!
//! Configuration only names logical document ids, never a physical location, so
//! the catalog is enumerated once at startup into an immutable snapshot. Unless a
//! handle is configured explicitly, every aggregate is read from the *first*
//! database and its *first* container: the deployment is assumed to have exactly
//! one meaningful pair. The snapshot is not refreshed if containers change later.

use crate::ports::{ContainerHandle, DocumentStore, PortError, PortResult};
use tracing::{info, warn};

/// One discovered database and its containers, in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub name: String,
    pub containers: Vec<String>,
}

/// An immutable view of the store's databases and containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    entries: Vec<DatabaseEntry>,
}

impl CatalogSnapshot {
    /// Lists every database and, for each, every container.
    ///
    /// Any store failure is returned as-is: a catalog that cannot be read is a
    /// fatal initialization error. An empty account is not an error here.
    pub async fn discover(store: &dyn DocumentStore) -> PortResult<Self> {
        let databases = store.list_databases().await?;
        let mut entries = Vec::with_capacity(databases.len());

        for name in databases {
            let containers = store.list_containers(&name).await?;
            info!(database = %name, containers = ?containers, "Discovered database");
            entries.push(DatabaseEntry { name, containers });
        }

        info!("Catalog discovery found {} databases", entries.len());
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<DatabaseEntry>) -> Self {
        Self { entries }
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn containers(&self, database: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.name == database)
            .map(|e| e.containers.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: &ContainerHandle) -> bool {
        self.containers(&handle.database)
            .is_some_and(|cs| cs.iter().any(|c| *c == handle.container))
    }

    /// The first container of the first database.
    pub fn first_container(&self) -> Option<ContainerHandle> {
        let entry = self.entries.first()?;
        let container = entry.containers.first()?;
        Some(ContainerHandle::new(entry.name.clone(), container.clone()))
    }

    /// Picks the container the repository will be bound to.
    ///
    /// A configured handle wins when the catalog actually contains it; otherwise
    /// the first-database/first-container rule applies.
    pub fn resolve(&self, preferred: Option<&ContainerHandle>) -> PortResult<ContainerHandle> {
        if let Some(handle) = preferred {
            if self.contains(handle) {
                return Ok(handle.clone());
            }
            warn!(
                container = %handle,
                "Configured container was not discovered; falling back to the first container"
            );
        }

        self.first_container().ok_or_else(|| {
            PortError::StoreNotInitialized(if self.is_empty() {
                "no databases were discovered".to_string()
            } else {
                "the first database has no containers".to_string()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::from_entries(vec![
            DatabaseEntry {
                name: "aikido".into(),
                containers: vec!["documents".into(), "archive".into()],
            },
            DatabaseEntry {
                name: "scratch".into(),
                containers: vec!["tmp".into()],
            },
        ])
    }

    #[test]
    fn first_database_and_container_are_selected() {
        let handle = snapshot().resolve(None).unwrap();
        assert_eq!(handle, ContainerHandle::new("aikido", "documents"));
    }

    #[test]
    fn configured_handle_is_used_when_discovered() {
        let preferred = ContainerHandle::new("scratch", "tmp");
        assert_eq!(snapshot().resolve(Some(&preferred)).unwrap(), preferred);
    }

    #[test]
    fn unknown_configured_handle_falls_back_to_first() {
        let preferred = ContainerHandle::new("missing", "nowhere");
        let handle = snapshot().resolve(Some(&preferred)).unwrap();
        assert_eq!(handle, ContainerHandle::new("aikido", "documents"));
    }

    #[test]
    fn empty_catalog_reports_store_not_initialized() {
        let err = CatalogSnapshot::default().resolve(None).unwrap_err();
        assert!(matches!(err, PortError::StoreNotInitialized(_)));
    }

    #[test]
    fn database_without_containers_reports_store_not_initialized() {
        let snapshot = CatalogSnapshot::from_entries(vec![DatabaseEntry {
            name: "empty".into(),
            containers: vec![],
        }]);
        assert!(matches!(
            snapshot.resolve(None),
            Err(PortError::StoreNotInitialized(_))
        ));
    }
}
