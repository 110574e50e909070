//! services/api/src/adapters/memory.rs
//!
//! An in-process `DocumentStore` used for local development (`STORE_BACKEND=memory`)
//! and tests. Databases and containers keep their insertion order, so catalog
//! discovery sees them in the order they were declared.

use aikido_live_core::ports::{
    ContainerHandle, DocumentStore, PortError, PortResult, Precondition, StoredDocument,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

struct MemContainer {
    name: String,
    /// id -> (document, version)
    items: HashMap<String, (Value, u64)>,
}

struct MemDatabase {
    name: String,
    containers: Vec<MemContainer>,
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    databases: RwLock<Vec<MemDatabase>>,
    writes: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a container, creating its database if needed.
    pub fn with_container(mut self, database: &str, container: &str) -> Self {
        let databases = self.databases.get_mut();
        let index = match databases.iter().position(|d| d.name == database) {
            Some(index) => index,
            None => {
                databases.push(MemDatabase {
                    name: database.to_string(),
                    containers: Vec::new(),
                });
                databases.len() - 1
            }
        };
        let db = &mut databases[index];
        if !db.containers.iter().any(|c| c.name == container) {
            db.containers.push(MemContainer {
                name: container.to_string(),
                items: HashMap::new(),
            });
        }
        self
    }

    /// Number of successful replace/create calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Reads a raw document, bypassing the port. Intended for assertions.
    pub async fn document(&self, container: &ContainerHandle, id: &str) -> Option<Value> {
        let databases = self.databases.read().await;
        find(&databases, container)?
            .items
            .get(id)
            .map(|(body, _)| body.clone())
    }

    /// Writes a raw document, bypassing the port and the write counter.
    pub async fn put(&self, container: &ContainerHandle, id: &str, body: Value) -> PortResult<()> {
        let mut databases = self.databases.write().await;
        let target = find_mut(&mut databases, container)?;
        let version = target.items.get(id).map(|(_, v)| v + 1).unwrap_or(1);
        target.items.insert(id.to_string(), (body, version));
        Ok(())
    }
}

fn find<'a>(databases: &'a [MemDatabase], handle: &ContainerHandle) -> Option<&'a MemContainer> {
    databases
        .iter()
        .find(|d| d.name == handle.database)?
        .containers
        .iter()
        .find(|c| c.name == handle.container)
}

fn find_mut<'a>(
    databases: &'a mut [MemDatabase],
    handle: &ContainerHandle,
) -> PortResult<&'a mut MemContainer> {
    databases
        .iter_mut()
        .find(|d| d.name == handle.database)
        .and_then(|d| d.containers.iter_mut().find(|c| c.name == handle.container))
        .ok_or_else(|| PortError::NotFound(format!("Container {} not found", handle)))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_databases(&self) -> PortResult<Vec<String>> {
        let databases = self.databases.read().await;
        Ok(databases.iter().map(|d| d.name.clone()).collect())
    }

    async fn list_containers(&self, database: &str) -> PortResult<Vec<String>> {
        let databases = self.databases.read().await;
        databases
            .iter()
            .find(|d| d.name == database)
            .map(|d| d.containers.iter().map(|c| c.name.clone()).collect())
            .ok_or_else(|| PortError::NotFound(format!("Database {} not found", database)))
    }

    async fn query_by_id(
        &self,
        container: &ContainerHandle,
        id: &str,
    ) -> PortResult<Vec<StoredDocument>> {
        let databases = self.databases.read().await;
        let target = find(&databases, container)
            .ok_or_else(|| PortError::NotFound(format!("Container {} not found", container)))?;
        Ok(target
            .items
            .get(id)
            .map(|(body, version)| StoredDocument {
                body: body.clone(),
                etag: Some(version.to_string()),
            })
            .into_iter()
            .collect())
    }

    async fn replace_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        item: Value,
        precondition: Precondition,
    ) -> PortResult<()> {
        let mut databases = self.databases.write().await;
        let target = find_mut(&mut databases, container)?;
        let Some((body, version)) = target.items.get_mut(id) else {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        };

        if let Precondition::IfMatch(etag) = precondition {
            if etag != version.to_string() {
                return Err(PortError::PreconditionFailed(id.to_string()));
            }
        }

        *body = item;
        *version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_item(&self, container: &ContainerHandle, item: Value) -> PortResult<()> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PortError::Unexpected("Document has no string 'id' field".to_string()))?
            .to_string();

        let mut databases = self.databases.write().await;
        let target = find_mut(&mut databases, container)?;
        if target.items.contains_key(&id) {
            return Err(PortError::Conflict(id));
        }
        target.items.insert(id, (item, 1));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handle() -> ContainerHandle {
        ContainerHandle::new("aikido", "documents")
    }

    #[tokio::test]
    async fn catalog_listing_keeps_declaration_order() {
        let store = InMemoryDocumentStore::new()
            .with_container("zeta", "b")
            .with_container("alpha", "a")
            .with_container("zeta", "a");
        assert_eq!(store.list_databases().await.unwrap(), vec!["zeta", "alpha"]);
        assert_eq!(store.list_containers("zeta").await.unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn stale_etag_is_rejected() {
        let store = InMemoryDocumentStore::new().with_container("aikido", "documents");
        store.create_item(&handle(), json!({ "id": "blog" })).await.unwrap();

        let first = store.query_by_id(&handle(), "blog").await.unwrap().remove(0);
        let etag = first.etag.unwrap();
        store
            .replace_item(
                &handle(),
                "blog",
                json!({ "id": "blog", "n": 1 }),
                Precondition::IfMatch(etag.clone()),
            )
            .await
            .unwrap();

        let err = store
            .replace_item(
                &handle(),
                "blog",
                json!({ "id": "blog", "n": 2 }),
                Precondition::IfMatch(etag),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = InMemoryDocumentStore::new().with_container("aikido", "documents");
        store.create_item(&handle(), json!({ "id": "users" })).await.unwrap();
        let err = store
            .create_item(&handle(), json!({ "id": "users" }))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(id) if id == "users"));
    }
}
