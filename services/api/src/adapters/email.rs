//! services/api/src/adapters/email.rs
//!
//! `EmailNotifier` adapters: SMTP delivery via lettre, and a log-only notifier
//! used when SMTP is not configured.

use crate::config::SmtpConfig;
use aikido_live_core::ports::{EmailNotifier, PortError, PortResult};
use aikido_live_core::repository::DocumentRepository;
use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const SITE_NAME: &str = "Aikido Live";

/// A rendered email, ready to send.
struct EmailBody {
    subject: String,
    text: String,
    html: String,
}

fn confirmation_email(first_name: &str, link: &str) -> EmailBody {
    EmailBody {
        subject: format!("Confirm your email - {}", SITE_NAME),
        text: format!(
            "Hello {first_name},\n\nWelcome to {SITE_NAME}! Please confirm your email address by opening this link:\n\n{link}\n\nThe link expires in 7 days."
        ),
        html: format!(
            "<h2>Welcome to {SITE_NAME}, {first_name}!</h2>\
             <p>Please confirm your email address:</p>\
             <p><a href=\"{link}\">Confirm my email</a></p>\
             <p>The link expires in 7 days.</p>"
        ),
    }
}

fn password_reset_email(first_name: &str, link: &str) -> EmailBody {
    EmailBody {
        subject: format!("Reset your password - {}", SITE_NAME),
        text: format!(
            "Hello {first_name},\n\nA password reset was requested for your account. Open this link to choose a new password:\n\n{link}\n\nThe link expires in 24 hours. If you did not request this, ignore this email."
        ),
        html: format!(
            "<h2>Password reset</h2>\
             <p>Hello {first_name}, a password reset was requested for your account.</p>\
             <p><a href=\"{link}\">Choose a new password</a></p>\
             <p>The link expires in 24 hours. If you did not request this, ignore this email.</p>"
        ),
    }
}

fn new_user_notice(first_name: &str, last_name: &str, email: &str) -> EmailBody {
    let at = Utc::now().format("%Y-%m-%d %H:%M:%S");
    EmailBody {
        subject: format!("New User Registration - {}", SITE_NAME),
        text: format!(
            "A new user has registered on {SITE_NAME}:\n\nName: {first_name} {last_name}\nEmail: {email}\nRegistration Time: {at} UTC"
        ),
        html: format!(
            "<h2>New User Registration</h2>\
             <p>A new user has registered on the {SITE_NAME} platform:</p>\
             <ul><li><strong>Name:</strong> {first_name} {last_name}</li>\
             <li><strong>Email:</strong> {email}</li>\
             <li><strong>Registration Time:</strong> {at} UTC</li></ul>"
        ),
    }
}

//=========================================================================================
// SMTP Notifier
//=========================================================================================

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    /// Used to look up Admin recipients for registration notices.
    repo: Arc<DocumentRepository>,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, repo: Arc<DocumentRepository>) -> PortResult<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| PortError::Unexpected(format!("SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .build();
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("Invalid SMTP_FROM address: {}", e)))?;

        Ok(Self { mailer, from, repo })
    }

    async fn send(&self, to: &str, body: &EmailBody) -> PortResult<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("Invalid recipient '{}': {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(body.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(body.html.clone()),
                    ),
            )
            .map_err(|e| PortError::Unexpected(format!("Failed to build message: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| PortError::Unexpected(format!("SMTP error: {}", e)))?;
        Ok(())
    }

    async fn admin_emails(&self) -> Vec<String> {
        match self.repo.get_users().await {
            Ok(Some(users)) => users.document.admin_emails(),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Error retrieving admin users for email notification: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl EmailNotifier for SmtpNotifier {
    async fn send_confirmation_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        self.send(to_email, &confirmation_email(first_name, link)).await?;
        info!(to = to_email, "Confirmation email sent");
        Ok(true)
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        self.send(to_email, &password_reset_email(first_name, link)).await?;
        info!(to = to_email, "Password reset email sent");
        Ok(true)
    }

    async fn send_new_user_notification_to_admins(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> PortResult<bool> {
        let admins = self.admin_emails().await;
        if admins.is_empty() {
            warn!("No admin users found to notify for new user registration");
            return Ok(true);
        }

        let body = new_user_notice(first_name, last_name, email);
        for admin in &admins {
            // One bad recipient must not stop the others.
            match self.send(admin, &body).await {
                Ok(()) => info!(admin = %admin, "New user notification sent"),
                Err(e) => error!(admin = %admin, "Failed to send new user notification: {}", e),
            }
        }
        Ok(true)
    }
}

//=========================================================================================
// Log-only Notifier
//=========================================================================================

/// Stands in for SMTP when it is not configured. Links are logged so local
/// development can still complete the confirmation and reset flows.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl EmailNotifier for LogNotifier {
    async fn send_confirmation_email(
        &self,
        to_email: &str,
        _first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        warn!(to = to_email, link, "SMTP is not configured; confirmation email not sent");
        Ok(true)
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        _first_name: &str,
        link: &str,
    ) -> PortResult<bool> {
        warn!(to = to_email, link, "SMTP is not configured; password reset email not sent");
        Ok(true)
    }

    async fn send_new_user_notification_to_admins(
        &self,
        _first_name: &str,
        _last_name: &str,
        email: &str,
    ) -> PortResult<bool> {
        warn!(new_user = email, "SMTP is not configured; skipping admin notification");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_carry_the_link() {
        let body = confirmation_email("Alice", "http://localhost/account/confirm-email?token=abc");
        assert!(body.text.contains("token=abc"));
        assert!(body.html.contains("href=\"http://localhost/account/confirm-email?token=abc\""));

        let body = password_reset_email("Alice", "http://x/reset");
        assert!(body.subject.starts_with("Reset your password"));
        assert!(body.text.contains("http://x/reset"));
    }

    #[test]
    fn admin_notice_names_the_new_user() {
        let body = new_user_notice("Bob", "Smith", "bob@example.com");
        assert!(body.text.contains("Bob Smith"));
        assert!(body.html.contains("bob@example.com"));
    }
}
