//! services/api/src/web/blog.rs
//!
//! Blog endpoints. Reads of published posts are public; writing requires a
//! session, and editing is limited to the post author or an Admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use aikido_live_core::{
    blog::{can_delete_comment, can_manage_post, touch},
    validation::{parse_tags, validate_comment, validate_post},
    BlogPost, Comment,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::warn;
use utoipa::ToSchema;

use crate::web::auth::{internal, HandlerError};
use crate::web::middleware::current_user;
use crate::web::state::{AppState, CurrentUser};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    /// Comma separated, e.g. "ukemi, seminar".
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub content: String,
    pub author_email: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_email: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_published: bool,
    pub tags: Vec<String>,
    pub comments: Vec<CommentResponse>,
    pub appreciation_count: usize,
    pub view_count: u64,
}

impl From<BlogPost> for PostResponse {
    fn from(post: BlogPost) -> Self {
        Self {
            appreciation_count: post.appreciated_by.len(),
            comments: post
                .comments
                .into_iter()
                .filter(|c| c.is_approved)
                .map(|c| CommentResponse {
                    id: c.id,
                    content: c.content,
                    author_email: c.author_email,
                    author_name: c.author_name,
                    created_at: c.created_at,
                })
                .collect(),
            id: post.id,
            title: post.title,
            content: post.content,
            author_email: post.author_email,
            author_name: post.author_name,
            created_at: post.created_at,
            updated_at: post.updated_at,
            is_published: post.is_published,
            tags: post.tags,
            view_count: post.view_count,
        }
    }
}

fn not_found() -> HandlerError {
    (StatusCode::NOT_FOUND, "Blog post not found.".to_string())
}

fn forbidden() -> HandlerError {
    (StatusCode::FORBIDDEN, "You are not allowed to do that.".to_string())
}

fn not_saved() -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "The change could not be saved. Please try again.".to_string(),
    )
}

async fn load_post(state: &AppState, post_id: &str) -> Result<BlogPost, HandlerError> {
    state
        .blog
        .by_id(post_id)
        .await
        .map_err(|e| internal("Failed to load blog post", e))?
        .ok_or_else(not_found)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /blog - Published posts, newest first
#[utoipa::path(
    get,
    path = "/blog",
    responses(
        (status = 200, description = "Published posts", body = [PostResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_published_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let posts = state
        .blog
        .published()
        .await
        .map_err(|e| internal("Failed to list blog posts", e))?;
    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

/// GET /blog/mine - The signed-in user's posts, drafts included
#[utoipa::path(
    get,
    path = "/blog/mine",
    responses(
        (status = 200, description = "Own posts", body = [PostResponse]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_mine_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let posts = state
        .blog
        .by_author(&user.email)
        .await
        .map_err(|e| internal("Failed to list own blog posts", e))?;
    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

/// GET /blog/{id} - A single post; counts as a view
///
/// Drafts are only visible to their author and Admins.
#[utoipa::path(
    get,
    path = "/blog/{id}",
    params(("id" = String, Path, description = "Blog post id")),
    responses(
        (status = 200, description = "The post", body = PostResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    session: Session,
) -> Result<impl IntoResponse, HandlerError> {
    let mut post = load_post(&state, &post_id).await?;

    if !post.is_published {
        let viewer = current_user(&state, &session).await;
        let allowed = viewer.is_some_and(|u| can_manage_post(&post, &u.email, u.role));
        if !allowed {
            return Err(not_found());
        }
    }

    match state.blog.increment_view_count(&post_id).await {
        Ok(true) => post.view_count += 1,
        Ok(false) => warn!(post_id = %post_id, "View count was not saved"),
        Err(e) => warn!(post_id = %post_id, "Failed to count view: {}", e),
    }
    Ok(Json(PostResponse::from(post)))
}

/// POST /blog - Create a post authored by the signed-in user
#[utoipa::path(
    post,
    path = "/blog",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Invalid post"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_post(&req.title, &req.content)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut post = BlogPost::new(
        req.title.trim(),
        req.content,
        user.email.clone(),
        user.display_name(),
    );
    post.tags = parse_tags(&req.tags);
    post.is_published = req.is_published;

    let saved = state
        .blog
        .create(post.clone())
        .await
        .map_err(|e| internal("Failed to create blog post", e))?;
    if !saved {
        return Err(not_saved());
    }
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /blog/{id} - Edit a post (author or Admin)
#[utoipa::path(
    put,
    path = "/blog/{id}",
    params(("id" = String, Path, description = "Blog post id")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Invalid post"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_post(&req.title, &req.content)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut post = load_post(&state, &post_id).await?;
    if !can_manage_post(&post, &user.email, user.role) {
        return Err(forbidden());
    }

    post.title = req.title.trim().to_string();
    post.content = req.content;
    post.tags = parse_tags(&req.tags);
    post.is_published = req.is_published;
    touch(&mut post);

    let saved = state
        .blog
        .update(post.clone())
        .await
        .map_err(|e| internal("Failed to update blog post", e))?;
    if !saved {
        return Err(not_saved());
    }
    Ok(Json(PostResponse::from(post)))
}

/// DELETE /blog/{id} - Delete a post (author or Admin)
#[utoipa::path(
    delete,
    path = "/blog/{id}",
    params(("id" = String, Path, description = "Blog post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let post = load_post(&state, &post_id).await?;
    if !can_manage_post(&post, &user.email, user.role) {
        return Err(forbidden());
    }

    let deleted = state
        .blog
        .delete(&post_id)
        .await
        .map_err(|e| internal("Failed to delete blog post", e))?;
    if !deleted {
        return Err(not_saved());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /blog/{id}/comments - Comment on a published post
#[utoipa::path(
    post,
    path = "/blog/{id}/comments",
    params(("id" = String, Path, description = "Blog post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Invalid comment"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_comment(&req.content).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let post = load_post(&state, &post_id).await?;
    if !post.is_published && !can_manage_post(&post, &user.email, user.role) {
        return Err(not_found());
    }

    let comment = Comment::new(req.content.trim(), user.email.clone(), user.display_name());
    let saved = state
        .blog
        .add_comment(&post_id, comment.clone())
        .await
        .map_err(|e| internal("Failed to add comment", e))?;
    if !saved {
        return Err(not_saved());
    }

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            content: comment.content,
            author_email: comment.author_email,
            author_name: comment.author_name,
            created_at: comment.created_at,
        }),
    ))
}

/// DELETE /blog/{id}/comments/{comment_id} - Delete a comment (its author or an Admin)
#[utoipa::path(
    delete,
    path = "/blog/{id}/comments/{comment_id}",
    params(
        ("id" = String, Path, description = "Blog post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the comment author"),
        (status = 404, description = "Post or comment not found")
    )
)]
pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let post = load_post(&state, &post_id).await?;
    let comment = post
        .comment(&comment_id)
        .ok_or((StatusCode::NOT_FOUND, "Comment not found.".to_string()))?;
    if !can_delete_comment(comment, &user.email, user.role) {
        return Err(forbidden());
    }

    let deleted = state
        .blog
        .delete_comment(&post_id, &comment_id)
        .await
        .map_err(|e| internal("Failed to delete comment", e))?;
    if !deleted {
        return Err(not_saved());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppreciationResponse {
    pub appreciated: bool,
    pub appreciation_count: usize,
}

/// POST /blog/{id}/appreciate - Toggle the signed-in user's appreciation
///
/// Drafts can only be appreciated by their author or an Admin.
#[utoipa::path(
    post,
    path = "/blog/{id}/appreciate",
    params(("id" = String, Path, description = "Blog post id")),
    responses(
        (status = 200, description = "Appreciation toggled", body = AppreciationResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn toggle_appreciation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let post = load_post(&state, &post_id).await?;
    if !post.is_published && !can_manage_post(&post, &user.email, user.role) {
        return Err(not_found());
    }

    let toggled = state
        .blog
        .toggle_appreciation(&post_id, &user.email)
        .await
        .map_err(|e| internal("Failed to toggle appreciation", e))?;
    if !toggled {
        return Err(not_found());
    }

    let post = load_post(&state, &post_id).await?;
    Ok(Json(AppreciationResponse {
        appreciated: post.appreciated_by.contains(&user.email),
        appreciation_count: post.appreciated_by.len(),
    }))
}
