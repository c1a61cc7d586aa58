// SPDX-License-Identifier: MIT

//! Playlist assembly and mutation.
//!
//! Builds combined track lists from per-artist canonical playlists and
//! writes them to Spotify in bounded batches.

use crate::error::AppError;
use crate::models::ArtistLink;
use crate::services::selection::{
    dedup_tracks, playlist_description, playlist_title, shuffle_tracks, trim_track_selection,
};
use crate::services::spotify::SpotifyApi;
use std::sync::Arc;

/// Spotify caps track writes at 100 URIs per call.
const WRITE_BATCH: usize = 100;

/// Generator for combined playlists.
#[derive(Clone)]
pub struct PlaylistGenerator {
    spotify: Arc<dyn SpotifyApi>,
}

impl PlaylistGenerator {
    pub fn new(spotify: Arc<dyn SpotifyApi>) -> Self {
        Self { spotify }
    }

    /// Build the combined track list for a set of artist links.
    ///
    /// Each link's source playlist is fetched in full and trimmed to the
    /// requested count. The first trimmed track of every link is pinned
    /// to the front so each artist shows up within the preview window;
    /// the rest is shuffled globally, then duplicates are removed
    /// (first occurrence wins). A source playlist that cannot be fetched
    /// is skipped so one dead link does not sink the whole generation.
    pub async fn build_track_list(
        &self,
        access_token: &str,
        entries: &[ArtistLink],
    ) -> Result<Vec<String>, AppError> {
        let mut first_tracks = Vec::with_capacity(entries.len());
        let mut rest = Vec::new();

        for entry in entries {
            let tracks = match self.all_playlist_tracks(access_token, &entry.playlist).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    tracing::warn!(
                        artist_id = %entry.id,
                        source_playlist = %entry.playlist,
                        error = %e,
                        "Skipping unreadable source playlist"
                    );
                    continue;
                }
            };

            let trimmed = trim_track_selection(&tracks, entry.number as usize);
            if let Some((first, tail)) = trimmed.split_first() {
                first_tracks.push(first.clone());
                rest.extend_from_slice(tail);
            }
        }

        first_tracks.extend(shuffle_tracks(rest));
        Ok(dedup_tracks(first_tracks))
    }

    /// Write a track list, replacing whatever the playlist held before.
    ///
    /// The first batch replaces, later batches append, so the playlist
    /// never ends up with stale tracks and is only transiently shorter
    /// than the final list.
    pub async fn set_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        if uris.is_empty() {
            return self.spotify.replace_tracks(access_token, playlist_id, &[]).await;
        }

        for (index, batch) in uris.chunks(WRITE_BATCH).enumerate() {
            if index == 0 {
                self.spotify
                    .replace_tracks(access_token, playlist_id, batch)
                    .await?;
            } else {
                self.spotify
                    .append_tracks(access_token, playlist_id, batch)
                    .await?;
            }
        }
        Ok(())
    }

    /// Create a new combined playlist and fill it. Returns the new id.
    pub async fn create_playlist(
        &self,
        access_token: &str,
        username: &str,
        entries: &[ArtistLink],
    ) -> Result<String, AppError> {
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let title = playlist_title(&names);
        let description = playlist_description(&names);

        let tracks = self.build_track_list(access_token, entries).await?;

        let playlist_id = self
            .spotify
            .create_playlist(access_token, username, &title, &description)
            .await?;
        self.set_playlist_tracks(access_token, &playlist_id, &tracks)
            .await?;

        tracing::info!(
            playlist_id,
            tracks = tracks.len(),
            artists = entries.len(),
            "Generated playlist"
        );
        Ok(playlist_id)
    }

    /// Update an existing playlist's details and/or tracks.
    pub async fn update_playlist(
        &self,
        access_token: &str,
        playlist_id: &str,
        entries: &[ArtistLink],
        update_title: bool,
        update_description: bool,
        update_tracks: bool,
    ) -> Result<(), AppError> {
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();

        if update_title || update_description {
            let title = playlist_title(&names);
            let description = playlist_description(&names);
            self.spotify
                .update_playlist_details(
                    access_token,
                    playlist_id,
                    update_title.then_some(title.as_str()),
                    update_description.then_some(description.as_str()),
                )
                .await?;
        }

        if update_tracks {
            self.regenerate_tracks(access_token, playlist_id, entries)
                .await?;
        }

        tracing::info!(
            playlist_id,
            update_title,
            update_description,
            update_tracks,
            "Updated playlist"
        );
        Ok(())
    }

    /// Rebuild and rewrite a playlist's track list.
    pub async fn regenerate_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        entries: &[ArtistLink],
    ) -> Result<(), AppError> {
        let tracks = self.build_track_list(access_token, entries).await?;
        self.set_playlist_tracks(access_token, playlist_id, &tracks)
            .await?;

        tracing::info!(playlist_id, tracks = tracks.len(), "Regenerated playlist tracks");
        Ok(())
    }

    /// Rewrite a playlist's generated title and/or description.
    pub async fn regenerate_details(
        &self,
        access_token: &str,
        playlist_id: &str,
        artist_names: &[String],
        title_flag: bool,
        description_flag: bool,
    ) -> Result<(), AppError> {
        if !title_flag && !description_flag {
            return Ok(());
        }

        let title = playlist_title(artist_names);
        let description = playlist_description(artist_names);
        self.spotify
            .update_playlist_details(
                access_token,
                playlist_id,
                title_flag.then_some(title.as_str()),
                description_flag.then_some(description.as_str()),
            )
            .await?;

        tracing::info!(playlist_id, title_flag, description_flag, "Regenerated playlist details");
        Ok(())
    }

    /// Fetch every track URI of a playlist, page by page.
    ///
    /// The fetch offset advances by the page limit, not by the tracks
    /// collected: pages may contain unplayable entries that the client
    /// drops, and those still occupy server-side positions.
    async fn all_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<Vec<String>, AppError> {
        let mut tracks: Vec<String> = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page = self
                .spotify
                .playlist_tracks(access_token, playlist_id, offset, None)
                .await?;
            let remaining = page.remaining();
            tracks.extend(page.items.into_iter().map(|item| item.uri));
            if remaining <= 0 || page.limit == 0 {
                break;
            }
            offset += page.limit;
        }

        Ok(tracks)
    }
}
