//! crates/aikido_live_core/src/repository.rs
//!
//! Fetches and persists whole aggregate documents by their fixed logical id.
//!
//! Every update is a read-modify-write of the entire aggregate. Under the default
//! [`WritePolicy::LastWriterWins`] the replace is unconditional: two requests that
//! read the same snapshot and both write will silently lose the first writer's
//! change. [`WritePolicy::Optimistic`] is the opt-in extension point that sends the
//! etag read alongside the document and reports a mismatch as a failed write.

use crate::domain::{BlogDocument, LibraryDocument, PlaylistsDocument, UserListDocument};
use crate::ports::{ContainerHandle, DocumentStore, PortError, PortResult, Precondition};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

//=========================================================================================
// Configuration Types
//=========================================================================================

/// The logical ids of the four aggregates, plus the tenant stamped on new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIds {
    pub users: String,
    pub library: String,
    pub playlists: String,
    pub blog: String,
    pub tenant_id: String,
}

impl Default for DocumentIds {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            library: "library".to_string(),
            playlists: "playlists".to_string(),
            blog: "blog".to_string(),
            tenant_id: "aikido-org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    #[default]
    LastWriterWins,
    Optimistic,
}

/// What `ensure_users` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsersDocument {
    Existing,
    Created,
    NotSaved,
}

//=========================================================================================
// Aggregates
//=========================================================================================

/// A document persisted as one stored record under its own `id`.
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> &str;
}

impl Aggregate for UserListDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Aggregate for LibraryDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Aggregate for PlaylistsDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Aggregate for BlogDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An aggregate together with the version tag it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub document: T,
    pub etag: Option<String>,
}

impl<T> Versioned<T> {
    /// A document that has never been read from the store.
    pub fn unversioned(document: T) -> Self {
        Self {
            document,
            etag: None,
        }
    }

    pub fn into_inner(self) -> T {
        self.document
    }
}

//=========================================================================================
// The Repository
//=========================================================================================

pub struct DocumentRepository {
    store: Arc<dyn DocumentStore>,
    container: Option<ContainerHandle>,
    ids: DocumentIds,
    policy: WritePolicy,
}

impl DocumentRepository {
    /// Binds the repository to a resolved container. `None` means catalog
    /// discovery found nothing: every operation then fails with
    /// [`PortError::StoreNotInitialized`].
    pub fn new(
        store: Arc<dyn DocumentStore>,
        container: Option<ContainerHandle>,
        ids: DocumentIds,
    ) -> Self {
        Self {
            store,
            container,
            ids,
            policy: WritePolicy::default(),
        }
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ids(&self) -> &DocumentIds {
        &self.ids
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn container(&self) -> PortResult<&ContainerHandle> {
        self.container.as_ref().ok_or_else(|| {
            PortError::StoreNotInitialized("no container is bound to the repository".to_string())
        })
    }

    /// Queries `id == logical_id` and deserializes at most one resulting document.
    pub async fn get_by_logical_id<T: DeserializeOwned>(
        &self,
        logical_id: &str,
    ) -> PortResult<Option<Versioned<T>>> {
        let container = self.container()?;
        let mut rows = self.store.query_by_id(container, logical_id).await?;

        if rows.len() > 1 {
            warn!(
                id = logical_id,
                count = rows.len(),
                "Query returned more than one document; using the first"
            );
        }
        if rows.is_empty() {
            return Ok(None);
        }

        let row = rows.swap_remove(0);
        let document = serde_json::from_value(row.body).map_err(|e| {
            PortError::Unexpected(format!("Document '{}' could not be decoded: {}", logical_id, e))
        })?;
        Ok(Some(Versioned {
            document,
            etag: row.etag,
        }))
    }

    /// Replaces the whole document identified by its own id field.
    ///
    /// Returns `Ok(false)` when the store rejects the write; only an unbound
    /// repository is reported as an error.
    pub async fn replace<T: Aggregate>(&self, versioned: &Versioned<T>) -> PortResult<bool> {
        let container = self.container()?;
        let id = versioned.document.id();
        let body = serde_json::to_value(&versioned.document)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let precondition = match (self.policy, &versioned.etag) {
            (WritePolicy::Optimistic, Some(etag)) => Precondition::IfMatch(etag.clone()),
            _ => Precondition::None,
        };

        match self.store.replace_item(container, id, body, precondition).await {
            Ok(()) => Ok(true),
            Err(PortError::PreconditionFailed(_)) => {
                warn!(id, "Replace rejected: document changed since it was read");
                Ok(false)
            }
            Err(e) => {
                error!(id, "Replace failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Inserts a brand-new aggregate.
    pub async fn create<T: Aggregate>(&self, document: &T) -> PortResult<bool> {
        let container = self.container()?;
        let body =
            serde_json::to_value(document).map_err(|e| PortError::Unexpected(e.to_string()))?;

        match self.store.create_item(container, body).await {
            Ok(()) => {
                info!(id = document.id(), container = %container, "Created aggregate document");
                Ok(true)
            }
            Err(e) => {
                error!(id = document.id(), "Create failed: {}", e);
                Ok(false)
            }
        }
    }

    // --- Users ---

    pub async fn get_users(&self) -> PortResult<Option<Versioned<UserListDocument>>> {
        self.get_by_logical_id(&self.ids.users).await
    }

    pub async fn update_users(&self, users: &Versioned<UserListDocument>) -> PortResult<bool> {
        self.replace(users).await
    }

    /// Creates an empty users aggregate if none exists.
    pub async fn ensure_users(&self) -> PortResult<UsersDocument> {
        if self.get_users().await?.is_some() {
            return Ok(UsersDocument::Existing);
        }
        let created = self
            .create(&UserListDocument::new(self.ids.users.clone()))
            .await?;
        Ok(if created {
            UsersDocument::Created
        } else {
            UsersDocument::NotSaved
        })
    }

    // --- Library ---

    pub async fn get_library(&self) -> PortResult<Option<Versioned<LibraryDocument>>> {
        self.get_by_logical_id(&self.ids.library).await
    }

    // --- Playlists ---

    pub async fn get_playlists(&self) -> PortResult<Option<Versioned<PlaylistsDocument>>> {
        self.get_by_logical_id(&self.ids.playlists).await
    }

    pub async fn update_playlists(
        &self,
        playlists: &Versioned<PlaylistsDocument>,
    ) -> PortResult<bool> {
        self.replace(playlists).await
    }

    // --- Blog ---

    pub async fn get_blog(&self) -> PortResult<Option<Versioned<BlogDocument>>> {
        self.get_by_logical_id(&self.ids.blog).await
    }

    pub async fn create_blog_document(&self, blog: &BlogDocument) -> PortResult<bool> {
        self.create(blog).await
    }

    pub async fn update_blog_document(&self, blog: &Versioned<BlogDocument>) -> PortResult<bool> {
        self.replace(blog).await
    }

    /// Reads the blog aggregate, creating an empty one first if it is absent.
    ///
    /// `None` means the aggregate was absent and could not be created.
    pub async fn get_or_create_blog(&self) -> PortResult<Option<Versioned<BlogDocument>>> {
        if let Some(existing) = self.get_blog().await? {
            return Ok(Some(existing));
        }

        let fresh = BlogDocument::new(self.ids.blog.clone(), self.ids.tenant_id.clone());
        if self.create_blog_document(&fresh).await? {
            // Re-read so the caller holds the store's version tag.
            return Ok(Some(
                self.get_blog()
                    .await?
                    .unwrap_or_else(|| Versioned::unversioned(fresh)),
            ));
        }

        // A concurrent request may have created it between our read and create.
        self.get_blog().await
    }
}
