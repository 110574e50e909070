//! crates/aikido_live_core/src/auth.rs
//!
//! Registration, login verification, email confirmation, password reset and
//! profile updates over the single users aggregate.
//!
//! Each user moves from `PendingConfirmation` (confirmation token set) to
//! `Confirmed` (tokens cleared). A password reset holds its own token and expiry,
//! independent of the confirmation state. Tokens are single-use.
//!
//! A missing users aggregate is a fatal configuration error. Unknown users,
//! invalid tokens and email collisions are ordinary negative results.

use crate::domain::{Role, User, UserListDocument};
use crate::outbox::{OutboundEmail, Outbox};
use crate::password::{generate_token, hash_password, verify_password};
use crate::ports::{PortError, PortResult};
use crate::repository::{DocumentRepository, Versioned};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

//=========================================================================================
// Settings and Inputs/Outcomes
//=========================================================================================

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Base for the links placed in confirmation and reset emails.
    pub public_base_url: Url,
    /// When set, unconfirmed users cannot authenticate.
    pub require_email_confirmation: bool,
    pub confirmation_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    /// Path under the base URL that confirms an email, e.g. `/auth/confirm-email`.
    pub confirm_email_path: String,
    /// Path under the base URL where a reset token is redeemed.
    pub reset_password_path: String,
}

pub const DEFAULT_CONFIRM_EMAIL_PATH: &str = "/auth/confirm-email";
pub const DEFAULT_RESET_PASSWORD_PATH: &str = "/auth/reset-password";

impl AuthSettings {
    pub fn new(public_base_url: Url) -> Self {
        Self {
            public_base_url,
            require_email_confirmation: true,
            confirmation_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::hours(24),
            confirm_email_path: DEFAULT_CONFIRM_EMAIL_PATH.to_string(),
            reset_password_path: DEFAULT_RESET_PASSWORD_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Registered(User),
    /// Another user already holds this email (case-insensitively).
    EmailInUse,
    /// The users aggregate could not be written back.
    NotSaved,
}

/// Requested profile changes. Empty `new_password` means "keep the current one".
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdateOutcome {
    Updated { email_changed: bool },
    UserNotFound,
    CurrentPasswordRequired,
    CurrentPasswordIncorrect,
    EmailInUse,
    NotSaved,
}

//=========================================================================================
// The Service
//=========================================================================================

pub struct AuthService {
    repo: Arc<DocumentRepository>,
    outbox: Outbox,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(repo: Arc<DocumentRepository>, outbox: Outbox, settings: AuthSettings) -> Self {
        Self {
            repo,
            outbox,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    async fn load_users(&self) -> PortResult<Versioned<UserListDocument>> {
        self.repo
            .get_users()
            .await?
            .ok_or_else(|| PortError::AggregateMissing(self.repo.ids().users.clone()))
    }

    pub async fn user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let users = self.load_users().await?;
        Ok(users.document.find_by_email(email).cloned())
    }

    pub async fn register(&self, request: NewRegistration) -> PortResult<Registration> {
        let mut users = self.load_users().await?;
        let email = request.email.trim().to_string();

        if users.document.find_by_email(&email).is_some() {
            debug!("Registration rejected: email already in use");
            return Ok(Registration::EmailInUse);
        }

        let token = generate_token();
        let user = User {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            role: Role::User,
            password_hash: hash_password(&request.password)?,
            is_email_confirmed: false,
            email_confirmation_token: Some(token.clone()),
            email_confirmation_token_expiry: Some(
                Utc::now() + self.settings.confirmation_token_ttl,
            ),
            password_reset_token: None,
            password_reset_token_expiry: None,
        };

        users.document.users.push(user.clone());
        if !self.repo.update_users(&users).await? {
            return Ok(Registration::NotSaved);
        }
        info!(email = %user.email, "Registered new user");

        self.outbox.enqueue(OutboundEmail::Confirmation {
            to: user.email.clone(),
            first_name: user.first_name.clone(),
            link: self.link(&self.settings.confirm_email_path, &token)?,
        });
        self.outbox.enqueue(OutboundEmail::NewUserAdminNotice {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        });

        Ok(Registration::Registered(user))
    }

    /// Confirms the user holding `token`. Unknown or expired tokens return false.
    pub async fn confirm_email(&self, token: &str) -> PortResult<bool> {
        let mut users = self.load_users().await?;
        let now = Utc::now();

        let Some(user) = users
            .document
            .users
            .iter_mut()
            .find(|u| u.has_valid_confirmation_token(token, now))
        else {
            debug!("Confirmation token is unknown or expired");
            return Ok(false);
        };

        user.is_email_confirmed = true;
        user.clear_confirmation_token();
        let email = user.email.clone();

        let saved = self.repo.update_users(&users).await?;
        if saved {
            info!(email = %email, "Email confirmed");
        }
        Ok(saved)
    }

    /// Returns the user only when the email exists, the password verifies and,
    /// if required, the email is confirmed. All failures look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> PortResult<Option<User>> {
        let users = self.load_users().await?;

        let Some(user) = users.document.find_by_email(email) else {
            return Ok(None);
        };
        if !verify_password(password, &user.password_hash) {
            return Ok(None);
        }
        if self.settings.require_email_confirmation && !user.is_email_confirmed {
            return Ok(None);
        }
        Ok(Some(user.clone()))
    }

    /// Issues a reset token to a confirmed user and queues the email.
    ///
    /// Reports success for unknown or unconfirmed addresses so the caller cannot
    /// learn which emails are registered. Only a failed write returns false.
    pub async fn send_password_reset_email(&self, email: &str) -> PortResult<bool> {
        let mut users = self.load_users().await?;

        let Some(user) = users
            .document
            .find_by_email_mut(email)
            .filter(|u| u.is_email_confirmed)
        else {
            debug!("Password reset requested for an unknown or unconfirmed email");
            return Ok(true);
        };

        let token = generate_token();
        user.password_reset_token = Some(token.clone());
        user.password_reset_token_expiry = Some(Utc::now() + self.settings.reset_token_ttl);
        let (to, first_name) = (user.email.clone(), user.first_name.clone());

        if !self.repo.update_users(&users).await? {
            return Ok(false);
        }

        self.outbox.enqueue(OutboundEmail::PasswordReset {
            to,
            first_name,
            link: self.link(&self.settings.reset_password_path, &token)?,
        });
        Ok(true)
    }

    /// Whether `token` is a live reset token, without redeeming it.
    pub async fn reset_token_is_valid(&self, token: &str) -> PortResult<bool> {
        let users = self.load_users().await?;
        let now = Utc::now();
        Ok(users
            .document
            .users
            .iter()
            .any(|u| u.has_valid_reset_token(token, now)))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<bool> {
        let mut users = self.load_users().await?;
        let now = Utc::now();

        let Some(user) = users
            .document
            .users
            .iter_mut()
            .find(|u| u.has_valid_reset_token(token, now))
        else {
            debug!("Reset token is unknown or expired");
            return Ok(false);
        };

        user.password_hash = hash_password(new_password)?;
        user.clear_reset_token();
        let email = user.email.clone();

        let saved = self.repo.update_users(&users).await?;
        if saved {
            info!(email = %email, "Password reset");
        }
        Ok(saved)
    }

    pub async fn update_profile(
        &self,
        current_email: &str,
        update: ProfileUpdate,
    ) -> PortResult<ProfileUpdateOutcome> {
        let mut users = self.load_users().await?;
        let new_email = update.email.trim().to_string();
        let new_password = update.new_password.filter(|p| !p.is_empty());

        let Some(current) = users.document.find_by_email(current_email) else {
            return Ok(ProfileUpdateOutcome::UserNotFound);
        };

        if new_password.is_some() {
            match update.current_password.as_deref().filter(|p| !p.is_empty()) {
                None => return Ok(ProfileUpdateOutcome::CurrentPasswordRequired),
                Some(supplied) if !verify_password(supplied, &current.password_hash) => {
                    return Ok(ProfileUpdateOutcome::CurrentPasswordIncorrect)
                }
                Some(_) => {}
            }
        }

        let email_changed = !current.has_email(&new_email);
        if email_changed && users.document.find_by_email(&new_email).is_some() {
            return Ok(ProfileUpdateOutcome::EmailInUse);
        }

        let password_hash = new_password.as_deref().map(hash_password).transpose()?;
        let Some(user) = users.document.find_by_email_mut(current_email) else {
            return Ok(ProfileUpdateOutcome::UserNotFound);
        };
        user.first_name = update.first_name.trim().to_string();
        user.last_name = update.last_name.trim().to_string();
        user.email = new_email;
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }

        if !self.repo.update_users(&users).await? {
            warn!("Profile update could not be saved");
            return Ok(ProfileUpdateOutcome::NotSaved);
        }
        Ok(ProfileUpdateOutcome::Updated { email_changed })
    }

    /// `<base><path>?token=<token>`, keeping any path prefix of the base URL.
    fn link(&self, path: &str, token: &str) -> PortResult<String> {
        let mut url = self.settings.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "Public base URL '{}' cannot carry a path",
                    self.settings.public_base_url
                ))
            })?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }
}
