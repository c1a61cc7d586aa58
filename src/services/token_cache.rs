// SPDX-License-Identifier: MIT

//! Per-user access-token cache.
//!
//! Spotify rate-limits per application, so every avoided token exchange
//! matters. Each user gets at most one cache entry, holding the refresh
//! token, the current access token with its expiry, and the username.
//! Entries evict themselves an hour after their token expires; eviction
//! is memory reclamation only and never invalidates anything externally.

use crate::db::PlaylistRecordStore;
use crate::error::AppError;
use crate::services::spotify::SpotifyApi;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How long an expired entry lingers before its eviction task removes it.
const EVICTION_GRACE_SECS: i64 = 60 * 60;

/// One user's cached credential.
struct CacheEntry {
    refresh_token: String,
    access_token: String,
    username: Option<String>,
    expires_at: DateTime<Utc>,
    /// Pending eviction task; aborted and re-armed on every refresh.
    eviction: JoinHandle<()>,
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        self.eviction.abort();
    }
}

/// Access-token cache keyed by user id.
///
/// The eviction task holds only the user id and looks its entry up at
/// fire time, so a refresh racing the timer simply wins: the entry is no
/// longer expired and stays put.
#[derive(Clone)]
pub struct TokenCache {
    spotify: Arc<dyn SpotifyApi>,
    records: PlaylistRecordStore,
    entries: Arc<DashMap<String, CacheEntry>>,
    grace: Duration,
}

impl TokenCache {
    pub fn new(spotify: Arc<dyn SpotifyApi>, records: PlaylistRecordStore) -> Self {
        Self::with_grace(spotify, records, Duration::seconds(EVICTION_GRACE_SECS))
    }

    /// Cache with a custom eviction grace period (tests use short ones).
    pub fn with_grace(
        spotify: Arc<dyn SpotifyApi>,
        records: PlaylistRecordStore,
        grace: Duration,
    ) -> Self {
        Self {
            spotify,
            records,
            entries: Arc::new(DashMap::new()),
            grace,
        }
    }

    /// Get a valid access token for the user.
    ///
    /// Cache hit with an unexpired token returns without any network
    /// call. A hit with an expired token re-exchanges the stored refresh
    /// token and re-arms the eviction timer. A miss loads the refresh
    /// token from the record store first; a rejected exchange surfaces as
    /// [`AppError::AuthFailure`] and leaves no entry behind.
    pub async fn access_token(&self, user_id: &str) -> Result<String, AppError> {
        if let Some(entry) = self.entries.get(user_id) {
            if Utc::now() < entry.expires_at {
                return Ok(entry.access_token.clone());
            }
            let refresh_token = entry.refresh_token.clone();
            drop(entry);
            return self.refresh_entry(user_id, &refresh_token).await;
        }

        let refresh_token = self.records.refresh_token(user_id).await?;
        let tokens = self.spotify.refresh_access_token(&refresh_token).await?;

        // the username is only fetched once per resident entry
        let username = self.spotify.current_username(&tokens.access_token).await?;

        let expires_at = Utc::now() + Duration::seconds(tokens.expires_in);
        self.entries.insert(
            user_id.to_string(),
            CacheEntry {
                refresh_token,
                access_token: tokens.access_token.clone(),
                username: Some(username),
                expires_at,
                eviction: self.spawn_eviction(user_id, tokens.expires_in),
            },
        );

        tracing::debug!(user_id, "Cached fresh access token");
        Ok(tokens.access_token)
    }

    /// Username of the user's Spotify account.
    ///
    /// Served from the cache when the user is resident; otherwise goes
    /// through the token path (which stores the username on the way).
    pub async fn username(&self, user_id: &str) -> Result<String, AppError> {
        if let Some(entry) = self.entries.get(user_id) {
            if let Some(username) = &entry.username {
                return Ok(username.clone());
            }
        }

        let access_token = self.access_token(user_id).await?;
        if let Some(entry) = self.entries.get(user_id) {
            if let Some(username) = &entry.username {
                return Ok(username.clone());
            }
        }

        // entry was evicted between the two lookups; ask Spotify directly
        self.spotify.current_username(&access_token).await
    }

    /// Drop a user's entry, cancelling its eviction timer.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.remove(user_id);
    }

    /// True if the user currently has a resident cache entry.
    pub fn is_cached(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Re-exchange an expired entry's refresh token and update in place.
    async fn refresh_entry(&self, user_id: &str, refresh_token: &str) -> Result<String, AppError> {
        let tokens = self.spotify.refresh_access_token(refresh_token).await?;
        let expires_at = Utc::now() + Duration::seconds(tokens.expires_in);

        if let Some(mut entry) = self.entries.get_mut(user_id) {
            entry.eviction.abort();
            entry.access_token = tokens.access_token.clone();
            entry.expires_at = expires_at;
            entry.eviction = self.spawn_eviction(user_id, tokens.expires_in);
        }

        tracing::debug!(user_id, "Refreshed cached access token");
        Ok(tokens.access_token)
    }

    /// Arm the eviction task for a user.
    fn spawn_eviction(&self, user_id: &str, expires_in: i64) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let user_id = user_id.to_string();
        let delay = Duration::seconds(expires_in.max(0)) + self.grace;
        let delay = delay.to_std().unwrap_or_default();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // a refresh may have beaten the timer; only evict if the
            // entry really is expired
            let removed = entries
                .remove_if(&user_id, |_, entry| Utc::now() >= entry.expires_at)
                .is_some();
            if removed {
                tracing::debug!(user_id, "Evicted idle token cache entry");
            }
        })
    }
}
