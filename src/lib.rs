// SPDX-License-Identifier: MIT

//! Tunemash: auto-generated multi-artist Spotify playlists
//!
//! This crate provides the backend API for combining the canonical
//! "This is ..." playlists of several artists into one playlist per
//! user, kept fresh by periodic reconciliation sweeps.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::PlaylistRecordStore;
use services::{CanonicalPlaylistResolver, PlaylistGenerator, ReconciliationEngine, TokenCache};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub records: PlaylistRecordStore,
    pub tokens: TokenCache,
    pub spotify: std::sync::Arc<dyn services::SpotifyApi>,
    pub resolver: CanonicalPlaylistResolver,
    pub generator: PlaylistGenerator,
    pub reconciliation: ReconciliationEngine,
    pub login_states: routes::auth::LoginStates,
}
