// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod batch;
pub mod generation;
pub mod resolver;
pub mod selection;
pub mod spotify;
pub mod token_cache;

pub use batch::{CheckOptions, CheckReport, ReconciliationEngine, RefreshReport};
pub use generation::PlaylistGenerator;
pub use resolver::{ArtistSearch, CanonicalPlaylistResolver, ResolvedArtist};
pub use spotify::{SpotifyApi, SpotifyClient};
pub use token_cache::TokenCache;
