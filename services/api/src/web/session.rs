//! services/api/src/web/session.rs
//!
//! Browser login sessions (the `session` cookie) via tower-sessions.
//!
//! The signed-in user's email is the only value kept in a session. Sessions
//! live in Postgres for the Postgres backend and in process memory otherwise.

use tower_sessions::{
    cookie::{time::Duration, SameSite},
    session, Expiry, Session, SessionManagerLayer, SessionStore,
};

pub const SESSION_COOKIE_NAME: &str = "session";

/// Session expiry time in days of inactivity.
const SESSION_EXPIRY_DAYS: i64 = 30;

const SIGNED_IN_EMAIL: &str = "signed_in_email";

/// Creates the session layer over `store`. `secure` should be set whenever the
/// site is served over HTTPS.
pub fn session_layer<Store>(store: Store, secure: bool) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Binds the session to `email` under a fresh session id.
pub async fn sign_in(session: &Session, email: &str) -> Result<(), session::Error> {
    session.cycle_id().await?;
    session.insert(SIGNED_IN_EMAIL, email).await
}

/// The email of the signed-in user, if any. A store failure reads as signed out.
pub async fn signed_in_email(session: &Session) -> Option<String> {
    match session.get::<String>(SIGNED_IN_EMAIL).await {
        Ok(email) => email,
        Err(e) => {
            tracing::error!("Failed to read session: {}", e);
            None
        }
    }
}

/// Deletes the session and expires its cookie.
pub async fn sign_out(session: &Session) -> Result<(), session::Error> {
    session.flush().await
}
