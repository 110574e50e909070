//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use crate::web::{auth, blog, content};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::confirm_email_handler,
        auth::forgot_password_handler,
        auth::check_reset_token_handler,
        auth::reset_password_handler,
        auth::get_profile_handler,
        auth::update_profile_handler,
        content::library_handler,
        content::playlists_handler,
        content::add_track_handler,
        blog::list_published_handler,
        blog::list_mine_handler,
        blog::get_post_handler,
        blog::create_post_handler,
        blog::update_post_handler,
        blog::delete_post_handler,
        blog::add_comment_handler,
        blog::delete_comment_handler,
        blog::toggle_appreciation_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            auth::UpdateProfileRequest,
            auth::UserResponse,
            auth::MessageResponse,
            content::VideoResponse,
            content::LibrarySectionResponse,
            content::PlaylistResponse,
            content::AddTrackRequest,
            blog::PostRequest,
            blog::CommentRequest,
            blog::PostResponse,
            blog::CommentResponse,
            blog::AppreciationResponse,
        )
    ),
    tags(
        (name = "Aikido Live API", description = "Accounts, video library, playlists and the club blog.")
    )
)]
pub struct ApiDoc;
