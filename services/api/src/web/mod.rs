pub mod auth;
pub mod blog;
pub mod content;
pub mod middleware;
pub mod rest;
pub mod session;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_sessions::SessionStore;

pub use middleware::require_auth;
use session::session_layer;
use state::AppState;

/// Builds the API router with browser sessions kept in `store`. CORS and
/// Swagger UI are layered on by the binary.
pub fn router<Store>(state: Arc<AppState>, store: Store, secure_cookies: bool) -> Router
where
    Store: SessionStore + Clone,
{
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/confirm-email", get(auth::confirm_email_handler))
        .route("/auth/forgot-password", post(auth::forgot_password_handler))
        .route(
            "/auth/reset-password",
            get(auth::check_reset_token_handler).post(auth::reset_password_handler),
        )
        .route("/blog", get(blog::list_published_handler))
        .route("/blog/{id}", get(blog::get_post_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/account/profile",
            get(auth::get_profile_handler).put(auth::update_profile_handler),
        )
        .route("/library", get(content::library_handler))
        .route("/playlists", get(content::playlists_handler))
        .route("/playlists/{name}/tracks", post(content::add_track_handler))
        .route("/blog", post(blog::create_post_handler))
        .route("/blog/mine", get(blog::list_mine_handler))
        .route(
            "/blog/{id}",
            put(blog::update_post_handler).delete(blog::delete_post_handler),
        )
        .route("/blog/{id}/comments", post(blog::add_comment_handler))
        .route(
            "/blog/{id}/comments/{comment_id}",
            delete(blog::delete_comment_handler),
        )
        .route("/blog/{id}/appreciate", post(blog::toggle_appreciation_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(session_layer(store, secure_cookies))
}
