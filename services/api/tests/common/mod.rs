//! Shared fixtures for the integration tests: an in-memory store bound to one
//! container, and a notifier that records every email it is asked to send.

#![allow(dead_code)]

use aikido_live_core::{
    AuthService, AuthSettings, BlogService, ContainerHandle, ContentService, DocumentIds,
    DocumentRepository, DocumentStore, EmailNotifier, OutboundEmail, Outbox, PortResult,
    WritePolicy,
};
use api_lib::adapters::InMemoryDocumentStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const DATABASE: &str = "aikido";
pub const CONTAINER: &str = "documents";

pub fn handle() -> ContainerHandle {
    ContainerHandle::new(DATABASE, CONTAINER)
}

pub fn memory_store() -> Arc<InMemoryDocumentStore> {
    Arc::new(InMemoryDocumentStore::new().with_container(DATABASE, CONTAINER))
}

pub fn settings() -> AuthSettings {
    AuthSettings::new(Url::parse("http://localhost:3000").expect("valid url"))
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("lock").clone()
    }

    /// Waits until at least `count` emails went through the outbox worker.
    pub async fn wait_for(&self, count: usize) -> Vec<OutboundEmail> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() > deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until an email the worker sent matches `pick`, and returns the pick.
    pub async fn wait_for_email<T>(&self, pick: impl Fn(&OutboundEmail) -> Option<T>) -> T {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(found) = self.sent().iter().find_map(&pick) {
                return found;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected email was never sent"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn record(&self, email: OutboundEmail) {
        self.sent.lock().expect("lock").push(email);
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_confirmation_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        self.record(OutboundEmail::Confirmation {
            to: to_email.to_string(),
            first_name: first_name.to_string(),
            link: link.to_string(),
        });
        Ok(true)
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        self.record(OutboundEmail::PasswordReset {
            to: to_email.to_string(),
            first_name: first_name.to_string(),
            link: link.to_string(),
        });
        Ok(true)
    }

    async fn send_new_user_notification_to_admins(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> PortResult<bool> {
        self.record(OutboundEmail::NewUserAdminNotice {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        });
        Ok(true)
    }
}

/// Extracts the `token` query parameter from an emailed link.
pub fn token_from_link(link: &str) -> String {
    Url::parse(link)
        .expect("emailed link is a URL")
        .query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .expect("link carries a token")
}

pub struct Harness {
    pub store: Arc<InMemoryDocumentStore>,
    pub repo: Arc<DocumentRepository>,
    pub auth: AuthService,
    pub blog: BlogService,
    pub content: ContentService,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// A repository over an empty store with an (empty) users aggregate.
    pub async fn new() -> Self {
        Self::with_settings(settings()).await
    }

    pub async fn with_settings(settings: AuthSettings) -> Self {
        let store = memory_store();
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let repo = Arc::new(DocumentRepository::new(
            dyn_store,
            Some(handle()),
            DocumentIds::default(),
        ));
        repo.ensure_users().await.expect("users aggregate");
        Self::over(store, repo, settings)
    }

    pub fn over(
        store: Arc<InMemoryDocumentStore>,
        repo: Arc<DocumentRepository>,
        settings: AuthSettings,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let (outbox, _worker) = Outbox::spawn(notifier.clone());
        Self {
            auth: AuthService::new(repo.clone(), outbox, settings),
            blog: BlogService::new(repo.clone()),
            content: ContentService::new(repo.clone()),
            store,
            repo,
            notifier,
        }
    }
}

/// A repository with a non-default write policy over the given store.
pub fn repository(store: Arc<dyn DocumentStore>, policy: WritePolicy) -> Arc<DocumentRepository> {
    Arc::new(
        DocumentRepository::new(store, Some(handle()), DocumentIds::default())
            .with_write_policy(policy),
    )
}
