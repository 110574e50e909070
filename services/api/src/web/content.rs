//! services/api/src/web/content.rs
//!
//! Video library and playlist endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use aikido_live_core::{
    Chapter, LibraryDocument, NewTrack, PlaylistsDocument, Track, TrackAdded,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::auth::{internal, HandlerError};
use crate::web::state::{AppState, CurrentUser};

#[derive(Serialize, ToSchema)]
pub struct VideoResponse {
    pub name: String,
    pub description: String,
    pub url: String,
    pub source: String,
}

impl From<Chapter> for VideoResponse {
    fn from(c: Chapter) -> Self {
        Self {
            name: c.name,
            description: c.description,
            url: c.url,
            source: c.source,
        }
    }
}

impl From<Track> for VideoResponse {
    fn from(t: Track) -> Self {
        Self {
            name: t.name,
            description: t.description,
            url: t.url,
            source: t.source,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LibrarySectionResponse {
    pub name: String,
    pub chapters: Vec<VideoResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct PlaylistResponse {
    pub name: String,
    pub tracks: Vec<VideoResponse>,
}

fn library_sections(doc: LibraryDocument) -> Vec<LibrarySectionResponse> {
    doc.library_contents
        .into_iter()
        .map(|section| LibrarySectionResponse {
            name: section.name,
            chapters: section.chapters.into_iter().map(VideoResponse::from).collect(),
        })
        .collect()
}

fn playlist_list(doc: PlaylistsDocument) -> Vec<PlaylistResponse> {
    doc.playlists_contents
        .into_iter()
        .map(|p| PlaylistResponse {
            name: p.playlist_name,
            tracks: p.tracks.into_iter().map(VideoResponse::from).collect(),
        })
        .collect()
}

/// GET /library - The video library; empty when none is stored
#[utoipa::path(
    get,
    path = "/library",
    responses(
        (status = 200, description = "Library sections", body = [LibrarySectionResponse]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn library_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let library = state
        .content
        .library()
        .await
        .map_err(|e| internal("Failed to load library", e))?;
    Ok(Json(library.map(library_sections).unwrap_or_default()))
}

/// GET /playlists - Playlists with embeddable Vimeo URLs
#[utoipa::path(
    get,
    path = "/playlists",
    responses(
        (status = 200, description = "Playlists", body = [PlaylistResponse]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn playlists_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let playlists = state
        .content
        .playlists()
        .await
        .map_err(|e| internal("Failed to load playlists", e))?;
    Ok(Json(playlists.map(playlist_list).unwrap_or_default()))
}

#[derive(Deserialize, ToSchema)]
pub struct AddTrackRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    /// e.g. "vimeo"
    pub source: String,
}

/// POST /playlists/{name}/tracks - Append a track to a playlist (Admin)
#[utoipa::path(
    post,
    path = "/playlists/{name}/tracks",
    params(("name" = String, Path, description = "Exact playlist name")),
    request_body = AddTrackRequest,
    responses(
        (status = 201, description = "Track added", body = VideoResponse),
        (status = 400, description = "Invalid track"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Playlist not found")
    )
)]
pub async fn add_track_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(playlist_name): Path<String>,
    Json(req): Json<AddTrackRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if !user.is_admin() {
        return Err((StatusCode::FORBIDDEN, "Admins only.".to_string()));
    }
    if req.name.trim().is_empty() || req.url.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Track name and URL are required.".to_string(),
        ));
    }

    let outcome = state
        .content
        .add_track(
            &playlist_name,
            NewTrack {
                name: req.name,
                description: req.description,
                url: req.url,
                source: req.source,
            },
        )
        .await
        .map_err(|e| internal("Failed to add track", e))?;

    match outcome {
        TrackAdded::Added(track) => Ok((StatusCode::CREATED, Json(VideoResponse::from(track)))),
        TrackAdded::PlaylistsMissing | TrackAdded::PlaylistNotFound => Err((
            StatusCode::NOT_FOUND,
            format!("Playlist '{}' not found.", playlist_name),
        )),
        TrackAdded::NotSaved => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "The track could not be saved. Please try again.".to_string(),
        )),
    }
}
