//! crates/aikido_live_core/src/content.rs
//!
//! Read access to the video library and playlists, and adding tracks to a playlist.
//!
//! Vimeo tracks are stored as bare video ids and expanded to player embed URLs
//! when read for display.

use crate::domain::{LibraryDocument, PlaylistsDocument, Track, VIMEO_SOURCE};
use crate::ports::PortResult;
use crate::repository::DocumentRepository;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::info;

const VIMEO_PLAYER_PREFIX: &str = "https://player.vimeo.com/video/";

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub name: String,
    pub description: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackAdded {
    Added(Track),
    PlaylistsMissing,
    PlaylistNotFound,
    NotSaved,
}

pub struct ContentService {
    repo: Arc<DocumentRepository>,
}

impl ContentService {
    pub fn new(repo: Arc<DocumentRepository>) -> Self {
        Self { repo }
    }

    pub async fn library(&self) -> PortResult<Option<LibraryDocument>> {
        Ok(self.repo.get_library().await?.map(|v| v.into_inner()))
    }

    /// The playlists aggregate with Vimeo track URLs expanded for embedding.
    pub async fn playlists(&self) -> PortResult<Option<PlaylistsDocument>> {
        Ok(self.repo.get_playlists().await?.map(|v| {
            let mut doc = v.into_inner();
            for track in doc
                .playlists_contents
                .iter_mut()
                .flat_map(|p| p.tracks.iter_mut())
            {
                if track.is_vimeo() {
                    track.url = vimeo_embed_url(&track.url);
                }
            }
            doc
        }))
    }

    /// Appends a track to the playlist named exactly `playlist_name`.
    pub async fn add_track(
        &self,
        playlist_name: &str,
        new_track: NewTrack,
    ) -> PortResult<TrackAdded> {
        let Some(mut playlists) = self.repo.get_playlists().await? else {
            return Ok(TrackAdded::PlaylistsMissing);
        };
        let Some(playlist) = playlists.document.playlist_mut(playlist_name) else {
            return Ok(TrackAdded::PlaylistNotFound);
        };

        let url = normalize_video_url(&new_track.url, &new_track.source);
        let track = Track {
            name: new_track.name.trim().to_string(),
            description: new_track.description,
            url,
            source: new_track.source,
        };
        playlist.tracks.push(track.clone());

        if !self.repo.update_playlists(&playlists).await? {
            return Ok(TrackAdded::NotSaved);
        }
        info!(playlist = playlist_name, track = %track.name, "Track added");
        Ok(TrackAdded::Added(track))
    }
}

fn vimeo_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:player\.vimeo\.com/video|vimeo\.com)/(\d+)").expect("static regex is valid")
    })
}

/// Reduces a Vimeo URL to its numeric video id. Other sources pass through.
pub fn normalize_video_url(url: &str, source: &str) -> String {
    let url = url.trim();
    if url.is_empty() || !source.eq_ignore_ascii_case(VIMEO_SOURCE) {
        return url.to_string();
    }
    if url.chars().all(|c| c.is_ascii_digit()) {
        return url.to_string();
    }
    vimeo_id_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}

pub fn vimeo_embed_url(video_id: &str) -> String {
    format!("{}{}", VIMEO_PLAYER_PREFIX, video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vimeo_urls_reduce_to_ids() {
        assert_eq!(normalize_video_url("123456", "vimeo"), "123456");
        assert_eq!(normalize_video_url("https://vimeo.com/76979871", "vimeo"), "76979871");
        assert_eq!(
            normalize_video_url("https://player.vimeo.com/video/76979871?h=abc", "Vimeo"),
            "76979871"
        );
    }

    #[test]
    fn other_sources_pass_through() {
        let url = "https://youtube.com/watch?v=xyz";
        assert_eq!(normalize_video_url(url, "youtube"), url);
        assert_eq!(
            normalize_video_url("https://vimeo.com/channels/x", "vimeo"),
            "https://vimeo.com/channels/x"
        );
    }

    #[test]
    fn embed_url_uses_player_prefix() {
        assert_eq!(vimeo_embed_url("42"), "https://player.vimeo.com/video/42");
    }
}
