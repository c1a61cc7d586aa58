// SPDX-License-Identifier: MIT

//! Shared test fixtures: an in-memory record store and a scriptable
//! Spotify mock with call counters.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tunemash::db::{MemoryStore, PlaylistRecordStore};
use tunemash::error::AppError;
use tunemash::models::ArtistLink;
use tunemash::services::spotify::{
    Artist, PlaylistDetails, PlaylistSummary, PlaylistTrack, SpotifyApi, TokenExchange,
    TokenRefresh, TracksPage,
};

/// Page size the mock serves when the caller does not ask for one.
const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Scriptable Spotify double.
///
/// State lives in plain mutex-guarded maps so tests can both script
/// responses and inspect what was written.
#[derive(Default)]
pub struct MockSpotify {
    pub expires_in: AtomicI64,
    pub fail_refresh: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub username_calls: AtomicUsize,
    created_counter: AtomicUsize,

    /// playlist id -> track URIs it serves
    pub sources: Mutex<HashMap<String, Vec<String>>>,
    /// track URIs served as unplayable: they occupy page positions but
    /// are dropped from page items, like null track entries
    pub unplayable: Mutex<HashSet<String>>,
    /// track URI -> credited artist URIs
    pub track_artists: Mutex<HashMap<String, Vec<String>>>,
    pub details: Mutex<HashMap<String, PlaylistDetails>>,
    /// playlists the mock user does not follow
    pub unfollowed: Mutex<HashSet<String>>,
    /// playlist ids whose track writes fail
    pub fail_writes: Mutex<HashSet<String>>,
    /// playlist id -> track URIs written through replace/append
    pub written: Mutex<HashMap<String, Vec<String>>>,
    /// recorded `replace_tracks` calls: (playlist id, batch size)
    pub replace_ops: Mutex<Vec<(String, usize)>>,
    /// recorded `append_tracks` calls: (playlist id, batch size)
    pub append_ops: Mutex<Vec<(String, usize)>>,
    /// recorded `update_playlist_details` calls: (id, name, description)
    pub detail_updates: Mutex<Vec<(String, Option<String>, Option<String>)>>,
    pub playlist_search: Mutex<HashMap<String, Vec<PlaylistSummary>>>,
    pub artist_search: Mutex<HashMap<String, Vec<Artist>>>,
    pub artist_directory: Mutex<HashMap<String, Artist>>,
}

impl MockSpotify {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.expires_in.store(3600, Ordering::SeqCst);
        mock
    }

    /// Register a source playlist serving `count` distinct tracks.
    pub fn add_source(&self, playlist_id: &str, prefix: &str, count: usize) -> Vec<String> {
        let tracks: Vec<String> = (0..count).map(|i| format!("{}:{}", prefix, i)).collect();
        self.sources
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), tracks.clone());
        tracks
    }

    pub fn set_details(&self, playlist_id: &str, name: &str, description: &str) {
        self.details.lock().unwrap().insert(
            playlist_id.to_string(),
            PlaylistDetails {
                id: playlist_id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                images: Vec::new(),
            },
        );
    }

    pub fn add_artist(&self, id: &str, name: &str) {
        self.artist_directory
            .lock()
            .unwrap()
            .insert(id.to_string(), relevant_artist(id, name));
    }

    pub fn written_tracks(&self, playlist_id: &str) -> Option<Vec<String>> {
        self.written.lock().unwrap().get(playlist_id).cloned()
    }
}

#[async_trait]
impl SpotifyApi for MockSpotify {
    async fn exchange_code(&self, _code: &str) -> Result<TokenExchange, AppError> {
        Ok(TokenExchange {
            access_token: "access-initial".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_in: self.expires_in.load(Ordering::SeqCst),
        })
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<TokenRefresh, AppError> {
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AppError::AuthFailure);
        }
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenRefresh {
            access_token: format!("token-{}", n),
            expires_in: self.expires_in.load(Ordering::SeqCst),
        })
    }

    async fn current_username(&self, _access_token: &str) -> Result<String, AppError> {
        self.username_calls.fetch_add(1, Ordering::SeqCst);
        Ok("mock-user".to_string())
    }

    async fn search_artists(
        &self,
        _access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Artist>, AppError> {
        let mut hits = self
            .artist_search
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn search_playlists(
        &self,
        _access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistSummary>, AppError> {
        let mut hits = self
            .playlist_search
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn playlist_details(
        &self,
        _access_token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, AppError> {
        self.details
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| AppError::SpotifyApi(format!("HTTP 404: playlist {}", playlist_id)))
    }

    async fn playlist_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<TracksPage, AppError> {
        let sources = self.sources.lock().unwrap();
        let tracks = sources
            .get(playlist_id)
            .ok_or_else(|| AppError::SpotifyApi(format!("HTTP 404: playlist {}", playlist_id)))?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let track_artists = self.track_artists.lock().unwrap();
        let unplayable = self.unplayable.lock().unwrap();
        let items = tracks
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter(|uri| !unplayable.contains(*uri))
            .map(|uri| PlaylistTrack {
                uri: uri.clone(),
                artist_uris: track_artists.get(uri).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(TracksPage {
            total: tracks.len() as u32,
            limit,
            offset,
            items,
        })
    }

    async fn is_following(
        &self,
        _access_token: &str,
        playlist_id: &str,
        user_ids: &[&str],
    ) -> Result<Vec<bool>, AppError> {
        let following = !self.unfollowed.lock().unwrap().contains(playlist_id);
        Ok(vec![following; user_ids.len()])
    }

    async fn create_playlist(
        &self,
        _access_token: &str,
        _username: &str,
        title: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let n = self.created_counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("generated-{}", n);
        self.set_details(&id, title, description);
        self.written.lock().unwrap().insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn replace_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        if self.fail_writes.lock().unwrap().contains(playlist_id) {
            return Err(AppError::SpotifyApi("HTTP 500: write failed".to_string()));
        }
        self.replace_ops
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), uris.len()));
        self.written
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), uris.to_vec());
        Ok(())
    }

    async fn append_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        if self.fail_writes.lock().unwrap().contains(playlist_id) {
            return Err(AppError::SpotifyApi("HTTP 500: write failed".to_string()));
        }
        self.append_ops
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), uris.len()));
        self.written
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend_from_slice(uris);
        Ok(())
    }

    async fn update_playlist_details(
        &self,
        _access_token: &str,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), AppError> {
        self.detail_updates.lock().unwrap().push((
            playlist_id.to_string(),
            name.map(str::to_string),
            description.map(str::to_string),
        ));
        if let Some(details) = self.details.lock().unwrap().get_mut(playlist_id) {
            if let Some(name) = name {
                details.name = name.to_string();
            }
            if let Some(description) = description {
                details.description = description.to_string();
            }
        }
        Ok(())
    }

    async fn artists(&self, _access_token: &str, ids: &[String]) -> Result<Vec<Artist>, AppError> {
        let directory = self.artist_directory.lock().unwrap();
        Ok(ids.iter().filter_map(|id| directory.get(id).cloned()).collect())
    }
}

/// Artist that passes the resolver's relevance gate.
pub fn relevant_artist(id: &str, name: &str) -> Artist {
    Artist {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:artist:{}", id),
        images: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        popularity: 60,
        followers: 100_000,
    }
}

pub fn link(artist_id: &str, name: &str, source_playlist: &str, number: u32) -> ArtistLink {
    ArtistLink {
        id: artist_id.to_string(),
        name: name.to_string(),
        playlist: source_playlist.to_string(),
        number,
    }
}

/// Fresh record store over an in-memory tree; the store handle is
/// returned too so tests can poke at raw nodes.
pub fn record_store() -> (Arc<MemoryStore>, PlaylistRecordStore) {
    let store = Arc::new(MemoryStore::new());
    let records = PlaylistRecordStore::new(store.clone());
    (store, records)
}

/// Seed a user with a refresh token.
pub async fn seed_user(records: &PlaylistRecordStore, user_id: &str) {
    records.add_user(user_id).await.unwrap();
    records
        .set_refresh_token(user_id, "refresh-token")
        .await
        .unwrap();
}
