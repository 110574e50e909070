pub mod auth;
pub mod blog;
pub mod catalog;
pub mod content;
pub mod domain;
pub mod outbox;
pub mod password;
pub mod ports;
pub mod repository;
pub mod validation;

pub use auth::{
    AuthService, AuthSettings, NewRegistration, ProfileUpdate, ProfileUpdateOutcome, Registration,
};
pub use blog::BlogService;
pub use catalog::CatalogSnapshot;
pub use content::{ContentService, NewTrack, TrackAdded};
pub use domain::{
    BlogDocument, BlogPost, Chapter, Comment, LibraryContent, LibraryDocument, PlaylistsContent,
    PlaylistsDocument, Role, Track, User, UserListDocument,
};
pub use outbox::{OutboundEmail, Outbox};
pub use ports::{
    ContainerHandle, DocumentStore, EmailNotifier, PortError, PortResult, Precondition,
    StoredDocument,
};
pub use repository::{DocumentIds, DocumentRepository, UsersDocument, Versioned, WritePolicy};
