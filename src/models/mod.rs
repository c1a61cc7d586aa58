// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod playlist;
pub mod user;

pub use playlist::{ArtistLink, PlaylistData, PlaylistRecord};
pub use user::PlaylistMetadata;
