// SPDX-License-Identifier: MIT

//! API routes for authenticated users.
//!
//! Handlers are thin: they resolve the caller's access token and hand
//! off to the record store, resolver and generator. The caller is
//! identified by the `x-user-id` header issued at login.

use crate::error::{AppError, Result};
use crate::models::{ArtistLink, PlaylistData};
use crate::services::ArtistSearch;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/artist", get(search_artist))
        .route("/playlists", post(create_playlist).get(get_playlists))
        .route(
            "/playlists/{id}",
            put(update_playlist).get(get_playlist).delete(delete_playlist),
        )
        .route("/playlists/{id}/refresh", post(refresh_playlist))
        .route("/playlists/{id}/active", post(activate_playlist))
        .route("/playlists/{id}/inactive", post(deactivate_playlist))
        .route("/user", delete(delete_user))
}

/// Resolve the calling user from the `x-user-id` header.
async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<String> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::AuthFailure)?;

    if !state.records.user_exists(user_id).await? {
        return Err(AppError::AuthFailure);
    }
    Ok(user_id.to_string())
}

// ─── Artist Search ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct ArtistQuery {
    pub name: String,
}

#[derive(Serialize)]
pub struct ArtistResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<ArtistEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ArtistEntry {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub images: Vec<String>,
    pub playlist: String,
}

impl From<ArtistSearch> for ArtistResponse {
    fn from(search: ArtistSearch) -> Self {
        ArtistResponse {
            query: search.query,
            artist: search.artist.map(|a| ArtistEntry {
                id: a.id,
                name: a.name,
                uri: a.uri,
                images: a.images,
                playlist: a.playlist,
            }),
            error: search.error_reason,
        }
    }
}

/// Search for an artist with a canonical playlist.
async fn search_artist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ArtistQuery>,
) -> Result<Json<ArtistResponse>> {
    let user_id = require_user(&state, &headers).await?;
    let access_token = state.tokens.access_token(&user_id).await?;

    let search = state.resolver.search_artist(&access_token, &query.name).await?;
    Ok(Json(search.into()))
}

// ─── Playlist CRUD ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePlaylistRequest {
    pub artists: Vec<ArtistLink>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub frequency: u32,
}

#[derive(Serialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
}

/// Generate a new combined playlist and persist its record.
async fn create_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreatePlaylistRequest>,
) -> Result<Json<CreatePlaylistResponse>> {
    let user_id = require_user(&state, &headers).await?;
    if request.artists.is_empty() {
        return Err(AppError::BadRequest("No artists given".to_string()));
    }

    let access_token = state.tokens.access_token(&user_id).await?;
    let username = state.tokens.username(&user_id).await?;

    let playlist_id = state
        .generator
        .create_playlist(&access_token, &username, &request.artists)
        .await?;
    state
        .records
        .add_playlist(
            &playlist_id,
            &user_id,
            &request.artists,
            request.active,
            request.frequency,
        )
        .await?;

    Ok(Json(CreatePlaylistResponse { id: playlist_id }))
}

#[derive(Deserialize)]
pub struct UpdatePlaylistRequest {
    pub artists: Vec<ArtistLink>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub frequency: u32,
    #[serde(default)]
    pub update_title: bool,
    #[serde(default)]
    pub update_description: bool,
    #[serde(default)]
    pub update_tracks: bool,
}

/// Update a playlist's record and, per the flags, its Spotify side.
async fn update_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
    Json(request): Json<UpdatePlaylistRequest>,
) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;

    // ownership check before anything touches Spotify
    state.records.playlist_artists(&playlist_id, &user_id).await?;

    let access_token = state.tokens.access_token(&user_id).await?;
    state
        .generator
        .update_playlist(
            &access_token,
            &playlist_id,
            &request.artists,
            request.update_title,
            request.update_description,
            request.update_tracks,
        )
        .await?;

    state
        .records
        .update_playlist(
            &playlist_id,
            &user_id,
            &request.artists,
            request.active,
            request.frequency,
        )
        .await?;
    Ok(())
}

/// Regenerate a playlist's tracks on demand.
async fn refresh_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;
    let artists = state.records.playlist_artists(&playlist_id, &user_id).await?;

    let access_token = state.tokens.access_token(&user_id).await?;
    state
        .generator
        .regenerate_tracks(&access_token, &playlist_id, &artists)
        .await?;
    state.records.touch_updated(&user_id, &playlist_id).await?;
    Ok(())
}

/// All playlists of the calling user, newest first.
async fn get_playlists(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PlaylistData>>> {
    let user_id = require_user(&state, &headers).await?;
    let playlists = state.records.user_playlists(&user_id).await?;
    Ok(Json(playlists))
}

/// One playlist of the calling user.
async fn get_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<Json<PlaylistData>> {
    let user_id = require_user(&state, &headers).await?;
    let playlist = state.records.playlist(&user_id, &playlist_id).await?;
    Ok(Json(playlist))
}

async fn activate_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;
    state.records.set_active(&user_id, &playlist_id, true).await
}

async fn deactivate_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;
    state.records.set_active(&user_id, &playlist_id, false).await
}

/// Drop a playlist record. The Spotify playlist itself stays; the user
/// unfollows it on their end and the check sweep reaps the record too.
async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;

    // ownership check; a foreign id must not delete someone else's record
    state.records.playlist_artists(&playlist_id, &user_id).await?;
    state.records.remove_playlist(&playlist_id, &user_id).await
}

/// Delete the calling user's account and every playlist record.
async fn delete_user(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<()> {
    let user_id = require_user(&state, &headers).await?;

    state.tokens.invalidate(&user_id);
    state.records.delete_user(&user_id).await
}
