//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::error;

use crate::web::session::signed_in_email;
use crate::web::state::{AppState, CurrentUser};

/// Resolves the session to the signed-in user, if any.
///
/// A session whose email no longer matches a user (e.g. after an email
/// change) reads as signed out. A store failure is logged and treated the same.
pub async fn current_user(state: &AppState, session: &Session) -> Option<CurrentUser> {
    let email = signed_in_email(session).await?;

    match state.auth.user_by_email(&email).await {
        Ok(Some(user)) => Some(CurrentUser::from_user(&user)),
        Ok(None) => None,
        Err(e) => {
            error!("Failed to load session user: {:?}", e);
            None
        }
    }
}

/// Middleware that loads the user bound to the session.
///
/// If valid, inserts a `CurrentUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = current_user(&state, &session)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
