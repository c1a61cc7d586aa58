// SPDX-License-Identifier: MIT

//! Playlist record types.

use crate::models::PlaylistMetadata;
use serde::{Deserialize, Serialize};

/// One artist's contribution to a generated playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistLink {
    /// Spotify artist id
    pub id: String,
    /// Denormalized display name, used for title/description generation
    /// and for re-resolving the source playlist when it disappears
    pub name: String,
    /// Canonical ("This is ...") source playlist id
    pub playlist: String,
    /// Requested number of tracks from this artist
    pub number: u32,
}

/// Record stored at `playlists/<playlist_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistRecord {
    /// Owning user id
    pub user: String,
    /// Ordered artist links making up the playlist
    pub artists: Vec<ArtistLink>,
}

/// A playlist record joined with its user-side metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistData {
    /// External playlist id
    pub id: String,
    #[serde(flatten)]
    pub metadata: PlaylistMetadata,
    pub artists: Vec<ArtistLink>,
}
