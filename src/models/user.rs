// SPDX-License-Identifier: MIT

//! User-side record types.
//!
//! A user document lives at `users/<user_id>` and carries the Spotify
//! refresh token plus one metadata node per generated playlist under
//! the `playlists` sub-path.

use serde::{Deserialize, Serialize};

/// Per-playlist metadata stored at `users/<user>/playlists/<playlist>`.
///
/// `created` is written once and never changed afterwards; `updated` is
/// bumped on every regeneration. Both are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    /// Last time the track list was (re)written
    pub updated: i64,
    /// When the playlist record was first created
    pub created: i64,
    /// Whether the reconciliation engine may refresh this playlist
    pub active: bool,
    /// Refresh cadence in days
    pub frequency: u32,
}
