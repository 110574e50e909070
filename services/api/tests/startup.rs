mod common;

use aikido_live_core::{
    CatalogSnapshot, ContainerHandle, DocumentIds, DocumentRepository, DocumentStore, PortError,
    PortResult, Precondition, StoredDocument, UsersDocument,
};
use api_lib::adapters::InMemoryDocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Lists one database but cannot list its containers.
struct UnreadableCatalog;

#[async_trait]
impl DocumentStore for UnreadableCatalog {
    async fn list_databases(&self) -> PortResult<Vec<String>> {
        Ok(vec!["aikido".to_string()])
    }

    async fn list_containers(&self, database: &str) -> PortResult<Vec<String>> {
        Err(PortError::Unexpected(format!("cannot list {}", database)))
    }

    async fn query_by_id(
        &self,
        _container: &ContainerHandle,
        _id: &str,
    ) -> PortResult<Vec<StoredDocument>> {
        unreachable!("discovery never queries documents")
    }

    async fn replace_item(
        &self,
        _container: &ContainerHandle,
        _id: &str,
        _item: Value,
        _precondition: Precondition,
    ) -> PortResult<()> {
        unreachable!("discovery never writes")
    }

    async fn create_item(&self, _container: &ContainerHandle, _item: Value) -> PortResult<()> {
        unreachable!("discovery never writes")
    }
}

#[tokio::test]
async fn discovery_keeps_store_order_and_resolves_the_first_pair() {
    let store = InMemoryDocumentStore::new()
        .with_container("zeta", "b")
        .with_container("alpha", "a")
        .with_container("zeta", "a");

    let catalog = CatalogSnapshot::discover(&store).await.unwrap();
    assert_eq!(catalog.database_names(), vec!["zeta", "alpha"]);
    assert_eq!(
        catalog.containers("zeta"),
        Some(&["b".to_string(), "a".to_string()][..])
    );
    assert_eq!(catalog.containers("alpha"), Some(&["a".to_string()][..]));
    assert_eq!(
        catalog.resolve(None).unwrap(),
        ContainerHandle::new("zeta", "b")
    );

    let configured = ContainerHandle::new("alpha", "a");
    assert_eq!(catalog.resolve(Some(&configured)).unwrap(), configured);
}

#[tokio::test]
async fn container_listing_failure_fails_discovery() {
    let err = CatalogSnapshot::discover(&UnreadableCatalog)
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Unexpected(message) if message == "cannot list aikido"));
}

#[tokio::test]
async fn empty_store_discovers_nothing_and_cannot_be_resolved() {
    let catalog = CatalogSnapshot::discover(&InMemoryDocumentStore::new())
        .await
        .unwrap();
    assert!(catalog.is_empty());
    assert!(matches!(
        catalog.resolve(None),
        Err(PortError::StoreNotInitialized(_))
    ));
}

#[tokio::test]
async fn users_document_is_created_once_and_then_found() {
    let store: Arc<dyn DocumentStore> = common::memory_store();
    let repo = DocumentRepository::new(store, Some(common::handle()), DocumentIds::default());

    assert_eq!(repo.ensure_users().await.unwrap(), UsersDocument::Created);
    assert_eq!(repo.ensure_users().await.unwrap(), UsersDocument::Existing);
    assert!(repo.get_users().await.unwrap().is_some());
}
