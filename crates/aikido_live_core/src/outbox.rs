//! crates/aikido_live_core/src/outbox.rs
//!
//! Fire-and-forget delivery of outbound email.
//!
//! Services enqueue jobs and return immediately. A single detached worker task
//! drains the queue through the [`EmailNotifier`] port; its failures go to the log
//! and never reach the request that triggered them.

use crate::ports::EmailNotifier;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A queued email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEmail {
    Confirmation {
        to: String,
        first_name: String,
        link: String,
    },
    PasswordReset {
        to: String,
        first_name: String,
        link: String,
    },
    NewUserAdminNotice {
        first_name: String,
        last_name: String,
        email: String,
    },
}

impl OutboundEmail {
    fn kind(&self) -> &'static str {
        match self {
            OutboundEmail::Confirmation { .. } => "confirmation",
            OutboundEmail::PasswordReset { .. } => "password_reset",
            OutboundEmail::NewUserAdminNotice { .. } => "new_user_admin_notice",
        }
    }
}

/// A cloneable handle for enqueueing email. The worker stops once every handle
/// has been dropped and the queue is empty.
#[derive(Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<OutboundEmail>,
}

impl Outbox {
    /// Starts the delivery worker on the current Tokio runtime.
    pub fn spawn(notifier: Arc<dyn EmailNotifier>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(receiver, notifier));
        (Self { sender }, worker)
    }

    pub fn enqueue(&self, email: OutboundEmail) {
        let kind = email.kind();
        if self.sender.send(email).is_err() {
            error!(kind, "Outbox worker is gone; email dropped");
        } else {
            debug!(kind, "Email enqueued");
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<OutboundEmail>,
    notifier: Arc<dyn EmailNotifier>,
) {
    while let Some(email) = receiver.recv().await {
        let kind = email.kind();
        let result = match &email {
            OutboundEmail::Confirmation {
                to,
                first_name,
                link,
            } => notifier.send_confirmation_email(to, first_name, link).await,
            OutboundEmail::PasswordReset {
                to,
                first_name,
                link,
            } => notifier.send_password_reset_email(to, first_name, link).await,
            OutboundEmail::NewUserAdminNotice {
                first_name,
                last_name,
                email,
            } => {
                notifier
                    .send_new_user_notification_to_admins(first_name, last_name, email)
                    .await
            }
        };

        match result {
            Ok(true) => info!(kind, "Email delivered"),
            Ok(false) => warn!(kind, "Email notifier reported a failed delivery"),
            Err(e) => error!(kind, "Email delivery failed: {}", e),
        }
    }
    info!("Outbox worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FlakyNotifier {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailNotifier for FlakyNotifier {
        async fn send_confirmation_email(&self, to: &str, _: &str, _: &str) -> PortResult<bool> {
            self.attempts.lock().await.push(to.to_string());
            Err(PortError::Unexpected("smtp down".into()))
        }

        async fn send_password_reset_email(&self, to: &str, _: &str, _: &str) -> PortResult<bool> {
            self.attempts.lock().await.push(to.to_string());
            Ok(false)
        }

        async fn send_new_user_notification_to_admins(
            &self,
            _: &str,
            _: &str,
            email: &str,
        ) -> PortResult<bool> {
            self.attempts.lock().await.push(email.to_string());
            Ok(true)
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_worker() {
        let notifier = Arc::new(FlakyNotifier::default());
        let (outbox, worker) = Outbox::spawn(notifier.clone());

        outbox.enqueue(OutboundEmail::Confirmation {
            to: "a@x.com".into(),
            first_name: "A".into(),
            link: "l".into(),
        });
        outbox.enqueue(OutboundEmail::PasswordReset {
            to: "b@x.com".into(),
            first_name: "B".into(),
            link: "l".into(),
        });
        outbox.enqueue(OutboundEmail::NewUserAdminNotice {
            first_name: "C".into(),
            last_name: "D".into(),
            email: "c@x.com".into(),
        });
        drop(outbox);
        worker.await.unwrap();

        let attempts = notifier.attempts.lock().await.clone();
        assert_eq!(attempts, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }
}
