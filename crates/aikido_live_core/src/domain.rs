//! crates/aikido_live_core/src/domain.rs
//!
//! Defines the aggregate documents persisted in the document store and the
//! entities embedded inside them.
//!
//! Every aggregate is a single stored record keyed by a fixed logical id
//! (e.g. `"users"`). Users, posts and comments have no persistence path of
//! their own: they only live inside the sequence of their owning aggregate.
//! Field names on the wire are lowerCamelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Source tag of tracks and chapters hosted on Vimeo.
pub const VIMEO_SOURCE: &str = "vimeo";

//=========================================================================================
// Users
//=========================================================================================

/// The role of a member. Anything that is not (case-insensitively) `Admin`
/// is read back as a plain `User`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Role::parse).unwrap_or_default())
    }
}

/// Where a user sits in the registration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    PendingConfirmation,
    Confirmed,
}

/// A registered member, stored inside [`UserListDocument::users`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(alias = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub is_email_confirmed: bool,
    #[serde(default)]
    pub email_confirmation_token: Option<String>,
    #[serde(default)]
    pub email_confirmation_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_token_expiry: Option<DateTime<Utc>>,
}

impl User {
    /// Emails are unique case-insensitively across the user list.
    pub fn has_email(&self, email: &str) -> bool {
        emails_match(&self.email, email)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn state(&self) -> AccountState {
        if self.is_email_confirmed {
            AccountState::Confirmed
        } else {
            AccountState::PendingConfirmation
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// True while the confirmation token equals `token` and has not expired.
    pub fn has_valid_confirmation_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        token_is_valid(
            self.email_confirmation_token.as_deref(),
            self.email_confirmation_token_expiry,
            token,
            now,
        )
    }

    /// True while the password reset token equals `token` and has not expired.
    pub fn has_valid_reset_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        token_is_valid(
            self.password_reset_token.as_deref(),
            self.password_reset_token_expiry,
            token,
            now,
        )
    }

    pub fn clear_confirmation_token(&mut self) {
        self.email_confirmation_token = None;
        self.email_confirmation_token_expiry = None;
    }

    pub fn clear_reset_token(&mut self) {
        self.password_reset_token = None;
        self.password_reset_token_expiry = None;
    }
}

fn token_is_valid(
    stored: Option<&str>,
    expiry: Option<DateTime<Utc>>,
    presented: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expiry) {
        (Some(stored), Some(expiry)) => {
            !presented.is_empty() && stored == presented && expiry > now
        }
        _ => false,
    }
}

/// Case-insensitive email comparison used for every user and author lookup.
pub fn emails_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// The single aggregate holding every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListDocument {
    pub id: String,
    #[serde(default)]
    pub users: Vec<User>,
}

impl UserListDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            users: Vec::new(),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.has_email(email))
    }

    pub fn find_by_email_mut(&mut self, email: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.has_email(email))
    }

    pub fn admin_emails(&self) -> Vec<String> {
        self.users
            .iter()
            .filter(|u| u.is_admin() && !u.email.trim().is_empty())
            .map(|u| u.email.clone())
            .collect()
    }
}

//=========================================================================================
// Library
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDocument {
    pub id: String,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: String,
    #[serde(default)]
    pub library_contents: Vec<LibraryContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryContent {
    #[serde(alias = "libraryName")]
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
}

//=========================================================================================
// Playlists
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsDocument {
    pub id: String,
    #[serde(default)]
    pub playlists_contents: Vec<PlaylistsContent>,
}

impl PlaylistsDocument {
    /// Playlists are looked up by exact name within the document.
    pub fn playlist_mut(&mut self, name: &str) -> Option<&mut PlaylistsContent> {
        self.playlists_contents
            .iter_mut()
            .find(|p| p.playlist_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsContent {
    pub playlist_name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
}

impl Track {
    pub fn is_vimeo(&self) -> bool {
        self.source.eq_ignore_ascii_case(VIMEO_SOURCE)
    }
}

//=========================================================================================
// Blog
//=========================================================================================

/// The single aggregate holding every blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogDocument {
    pub id: String,
    #[serde(default, alias = "tenantid")]
    pub tenant_id: String,
    #[serde(default)]
    pub blog_posts: Vec<BlogPost>,
}

impl BlogDocument {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            blog_posts: Vec::new(),
        }
    }

    pub fn post(&self, post_id: &str) -> Option<&BlogPost> {
        self.blog_posts.iter().find(|p| p.id == post_id)
    }

    pub fn post_mut(&mut self, post_id: &str) -> Option<&mut BlogPost> {
        self.blog_posts.iter_mut().find(|p| p.id == post_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_email: String,
    #[serde(default)]
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub appreciated_by: BTreeSet<String>,
    #[serde(default)]
    pub view_count: u64,
}

impl BlogPost {
    /// A new unpublished post with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author_email: impl Into<String>,
        author_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            author_email: author_email.into(),
            author_name: author_name.into(),
            created_at: now,
            updated_at: now,
            is_published: false,
            tags: Vec::new(),
            comments: Vec::new(),
            appreciated_by: BTreeSet::new(),
            view_count: 0,
        }
    }

    pub fn is_authored_by(&self, email: &str) -> bool {
        emails_match(&self.author_email, email)
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}

fn approved_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub blog_post_id: String,
    pub content: String,
    pub author_email: String,
    #[serde(default)]
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "approved_by_default")]
    pub is_approved: bool,
}

impl Comment {
    /// Comments are auto-approved.
    pub fn new(
        content: impl Into<String>,
        author_email: impl Into<String>,
        author_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            blog_post_id: String::new(),
            content: content.into(),
            author_email: author_email.into(),
            author_name: author_name.into(),
            created_at: Utc::now(),
            is_approved: true,
        }
    }

    pub fn is_authored_by(&self, email: &str) -> bool {
        emails_match(&self.author_email, email)
    }
}
