//! Two registrations that read the users aggregate before either writes it.
//!
//! Under last-writer-wins the second write silently drops the first user. With
//! the optimistic policy the second write is rejected instead.

mod common;

use aikido_live_core::{
    ContainerHandle, DocumentStore, NewRegistration, PortResult, Precondition, Registration,
    StoredDocument, WritePolicy,
};
use api_lib::adapters::InMemoryDocumentStore;
use async_trait::async_trait;
use common::{repository, settings, Harness};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

/// Holds the first `gated` reads at a barrier so they all see the same snapshot.
struct GatedStore {
    inner: Arc<InMemoryDocumentStore>,
    barrier: Barrier,
    gated: usize,
    reads: AtomicUsize,
}

impl GatedStore {
    fn new(inner: Arc<InMemoryDocumentStore>, gated: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(gated),
            gated,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn list_databases(&self) -> PortResult<Vec<String>> {
        self.inner.list_databases().await
    }

    async fn list_containers(&self, database: &str) -> PortResult<Vec<String>> {
        self.inner.list_containers(database).await
    }

    async fn query_by_id(
        &self,
        container: &ContainerHandle,
        id: &str,
    ) -> PortResult<Vec<StoredDocument>> {
        let result = self.inner.query_by_id(container, id).await;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.barrier.wait().await;
        }
        result
    }

    async fn replace_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        item: Value,
        precondition: Precondition,
    ) -> PortResult<()> {
        self.inner.replace_item(container, id, item, precondition).await
    }

    async fn create_item(&self, container: &ContainerHandle, item: Value) -> PortResult<()> {
        self.inner.create_item(container, item).await
    }
}

fn registration(email: &str) -> NewRegistration {
    NewRegistration {
        first_name: "Racer".into(),
        last_name: "Test".into(),
        email: email.into(),
        password: "secret1".into(),
    }
}

/// Runs two registrations concurrently against a users aggregate that both
/// read before either writes. Returns the outcomes and the stored user count.
async fn race(policy: WritePolicy) -> (Registration, Registration, usize) {
    let inner = Arc::new(InMemoryDocumentStore::new().with_container("aikido", "documents"));
    repository(inner.clone(), WritePolicy::LastWriterWins)
        .ensure_users()
        .await
        .unwrap();

    let gated = Arc::new(GatedStore::new(inner.clone(), 2));
    let repo = repository(gated, policy);
    let harness = Arc::new(Harness::over(inner.clone(), repo, settings()));

    let (a, b) = tokio::join!(
        {
            let h = harness.clone();
            async move { h.auth.register(registration("a@example.com")).await.unwrap() }
        },
        {
            let h = harness.clone();
            async move { h.auth.register(registration("b@example.com")).await.unwrap() }
        }
    );

    let users = harness.repo.get_users().await.unwrap().unwrap();
    (a, b, users.document.users.len())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_writer_wins_loses_one_registration() {
    let (a, b, stored) = race(WritePolicy::LastWriterWins).await;

    // Both callers were told they registered...
    assert!(matches!(a, Registration::Registered(_)));
    assert!(matches!(b, Registration::Registered(_)));
    // ...but only one user survived.
    assert_eq!(stored, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimistic_policy_rejects_the_stale_write() {
    let (a, b, stored) = race(WritePolicy::Optimistic).await;

    let saved = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Registration::Registered(_)))
        .count();
    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Registration::NotSaved))
        .count();
    assert_eq!((saved, rejected), (1, 1));
    assert_eq!(stored, 1);
}
