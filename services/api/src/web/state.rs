//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use aikido_live_core::{
    AuthService, AuthSettings, BlogService, ContentService, DocumentRepository, Outbox, Role,
    User,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<DocumentRepository>,
    pub auth: Arc<AuthService>,
    pub blog: Arc<BlogService>,
    pub content: Arc<ContentService>,
}

impl AppState {
    /// Wires the core services over one repository and one outbox.
    pub fn new(config: Arc<Config>, repo: Arc<DocumentRepository>, outbox: Outbox) -> Self {
        let mut settings = AuthSettings::new(config.public_base_url.clone());
        settings.require_email_confirmation = config.require_email_confirmation;
        settings.confirm_email_path = config.confirm_email_path.clone();
        settings.reset_password_path = config.reset_password_path.clone();

        Self {
            auth: Arc::new(AuthService::new(repo.clone(), outbox, settings)),
            blog: Arc::new(BlogService::new(repo.clone())),
            content: Arc::new(ContentService::new(repo.clone())),
            repo,
            config,
        }
    }
}

//=========================================================================================
// CurrentUser (Specific to One Authenticated Request)
//=========================================================================================

/// The signed-in user, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
