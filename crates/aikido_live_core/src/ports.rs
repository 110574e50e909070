//! crates/aikido_live_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document database and mail transport.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Catalog discovery produced no usable database/container pair.
    #[error("Aggregate store not initialized: {0}")]
    StoreNotInitialized(String),
    /// A required aggregate document is absent from the container.
    #[error("Aggregate document '{0}' not initialized")]
    AggregateMissing(String),
    #[error("Precondition failed for document '{0}'")]
    PreconditionFailed(String),
    #[error("Document '{0}' already exists")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Document Store Types
//=========================================================================================

/// A physical location inside the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    pub database: String,
    pub container: String,
}

impl ContainerHandle {
    pub fn new(database: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.container)
    }
}

/// A raw document as returned by a query, with the store's opaque version tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub body: Value,
    pub etag: Option<String>,
}

/// Condition attached to a replace. `None` is an unconditional overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Precondition {
    #[default]
    None,
    IfMatch(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of every database in the account.
    async fn list_databases(&self) -> PortResult<Vec<String>>;

    /// Names of every container in `database`.
    async fn list_containers(&self, database: &str) -> PortResult<Vec<String>>;

    /// Runs the filter `id == id` against a container. Zero rows is not an error.
    async fn query_by_id(&self, container: &ContainerHandle, id: &str)
        -> PortResult<Vec<StoredDocument>>;

    /// Replaces the whole document identified by `id`.
    async fn replace_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        item: Value,
        precondition: Precondition,
    ) -> PortResult<()>;

    /// Inserts a new document; its id is read from the `id` field of `item`.
    async fn create_item(&self, container: &ContainerHandle, item: Value) -> PortResult<()>;
}

#[async_trait]
pub trait EmailNotifier: Send + Sync {
    async fn send_confirmation_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool>;

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool>;

    /// Notifies every Admin user of a new registration. No admins is not a failure.
    async fn send_new_user_notification_to_admins(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> PortResult<bool>;
}
