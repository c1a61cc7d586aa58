// SPDX-License-Identifier: MIT

//! Typed façade over the key-value store for user and playlist records.
//!
//! Layout:
//! - `users/<user_id>` holds `{ refresh_token, playlists: { <playlist_id>:
//!   { updated, created, active, frequency } } }`
//! - `playlists/<playlist_id>` holds `{ user, artists: [ { id, name,
//!   playlist, number } ] }`

use crate::db::collections;
use crate::db::store::KeyValueStore;
use crate::error::AppError;
use crate::models::{ArtistLink, PlaylistData, PlaylistMetadata, PlaylistRecord};
use crate::time_utils::now_millis;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One hour of lenience so a sweep running slightly early still picks up
/// records that are due on the day boundary.
const REFRESH_LENIENCE_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Record store for users and their generated playlists.
#[derive(Clone)]
pub struct PlaylistRecordStore {
    store: Arc<dyn KeyValueStore>,
}

impl PlaylistRecordStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Ensure a user node exists.
    pub async fn add_user(&self, user_id: &str) -> Result<(), AppError> {
        self.store
            .update(collections::USERS, user_id, json!({}))
            .await?;
        tracing::info!(user_id, "Added user");
        Ok(())
    }

    /// Store (or replace) the user's Spotify refresh token.
    pub async fn set_refresh_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        self.store
            .update(collections::USERS, user_id, json!({ "refresh_token": token }))
            .await
    }

    /// Read the user's refresh token; `NotFound` if the user has none.
    pub async fn refresh_token(&self, user_id: &str) -> Result<String, AppError> {
        self.store
            .get_field(collections::USERS, user_id, &["refresh_token"])
            .await?
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| AppError::NotFound(format!("Refresh token for user {}", user_id)))
    }

    /// Check that a user exists in the store.
    pub async fn user_exists(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.store.get(collections::USERS, user_id).await?.is_some())
    }

    /// Delete a user and every playlist record they own.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        let playlist_ids: Vec<String> = self
            .store
            .get_field(collections::USERS, user_id, &["playlists"])
            .await?
            .and_then(|v| v.as_object().map(|o| o.keys().cloned().collect()))
            .unwrap_or_default();

        for playlist_id in &playlist_ids {
            self.store.delete(collections::PLAYLISTS, playlist_id).await?;
        }
        self.store.delete(collections::USERS, user_id).await?;

        tracing::info!(user_id, count = playlist_ids.len(), "Deleted user and playlists");
        Ok(())
    }

    // ─── Playlist Operations ─────────────────────────────────────

    /// Create a playlist record and its user-side metadata.
    ///
    /// Links requesting fewer than one track are discarded before the
    /// record is written.
    pub async fn add_playlist(
        &self,
        playlist_id: &str,
        user_id: &str,
        artists: &[ArtistLink],
        active: bool,
        frequency: u32,
    ) -> Result<(), AppError> {
        let artists = valid_links(artists);
        let record = PlaylistRecord {
            user: user_id.to_string(),
            artists,
        };

        self.store
            .create(
                collections::PLAYLISTS,
                playlist_id,
                serde_json::to_value(&record).map_err(|e| AppError::Internal(e.into()))?,
            )
            .await?;

        let now = now_millis();
        self.store
            .set_field(
                collections::USERS,
                user_id,
                &["playlists", playlist_id],
                json!({
                    "updated": now,
                    "created": now,
                    "active": active,
                    "frequency": frequency,
                }),
            )
            .await?;

        tracing::info!(user_id, playlist_id, "Added playlist record");
        Ok(())
    }

    /// Rewrite a playlist record, keeping its original creation time.
    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        user_id: &str,
        artists: &[ArtistLink],
        active: bool,
        frequency: u32,
    ) -> Result<(), AppError> {
        // read first so a missing record surfaces as NotFound
        let existing = self.metadata(user_id, playlist_id).await?;

        let artists = valid_links(artists);
        let record = PlaylistRecord {
            user: user_id.to_string(),
            artists,
        };
        self.store
            .update(
                collections::PLAYLISTS,
                playlist_id,
                serde_json::to_value(&record).map_err(|e| AppError::Internal(e.into()))?,
            )
            .await?;

        self.store
            .update_field(
                collections::USERS,
                user_id,
                &["playlists", playlist_id],
                json!({
                    "updated": now_millis(),
                    "created": existing.created,
                    "active": active,
                    "frequency": frequency,
                }),
            )
            .await?;

        tracing::info!(user_id, playlist_id, "Updated playlist record");
        Ok(())
    }

    /// Rewrite only a record's artist links.
    pub async fn set_playlist_artists(
        &self,
        playlist_id: &str,
        artists: &[ArtistLink],
    ) -> Result<(), AppError> {
        self.store
            .update_field(
                collections::PLAYLISTS,
                playlist_id,
                &["artists"],
                serde_json::to_value(valid_links(artists))
                    .map_err(|e| AppError::Internal(e.into()))?,
            )
            .await
    }

    /// Remove a playlist record.
    ///
    /// The `playlists/<id>` document goes first; a crash between the two
    /// deletes leaves an orphaned-but-harmless user pointer instead of a
    /// pointer to a live record owned by nobody.
    pub async fn remove_playlist(&self, playlist_id: &str, user_id: &str) -> Result<(), AppError> {
        self.store.delete(collections::PLAYLISTS, playlist_id).await?;
        self.store
            .delete_field(collections::USERS, user_id, &["playlists", playlist_id])
            .await?;

        tracing::info!(user_id, playlist_id, "Removed playlist record");
        Ok(())
    }

    /// Read a record's artist links, enforcing ownership.
    pub async fn playlist_artists(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<Vec<ArtistLink>, AppError> {
        let record = self
            .store
            .get(collections::PLAYLISTS, playlist_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playlist {}", playlist_id)))?;
        let record: PlaylistRecord =
            serde_json::from_value(record).map_err(|e| AppError::Database(e.to_string()))?;

        if record.user != user_id {
            return Err(AppError::Unauthorized);
        }
        Ok(record.artists)
    }

    /// Read one playlist with metadata and links.
    pub async fn playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<PlaylistData, AppError> {
        let metadata = self.metadata(user_id, playlist_id).await?;
        let artists = self.playlist_artists(playlist_id, user_id).await?;
        Ok(PlaylistData {
            id: playlist_id.to_string(),
            metadata,
            artists,
        })
    }

    /// All of a user's playlists, newest first.
    pub async fn user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistData>, AppError> {
        let nodes = self
            .store
            .get_field(collections::USERS, user_id, &["playlists"])
            .await?;
        let Some(Value::Object(nodes)) = nodes else {
            return Ok(Vec::new());
        };

        let mut playlists = Vec::with_capacity(nodes.len());
        for (playlist_id, node) in nodes {
            let metadata = parse_metadata(&node);
            let artists = self.playlist_artists(&playlist_id, user_id).await?;
            playlists.push(PlaylistData {
                id: playlist_id,
                metadata,
                artists,
            });
        }

        playlists.sort_by(|a, b| b.metadata.created.cmp(&a.metadata.created));
        Ok(playlists)
    }

    /// Flip the `active` flag; a write only happens on an actual change.
    pub async fn set_active(
        &self,
        user_id: &str,
        playlist_id: &str,
        active: bool,
    ) -> Result<(), AppError> {
        let metadata = self.metadata(user_id, playlist_id).await?;
        if metadata.active == active {
            return Ok(());
        }
        self.store
            .update_field(
                collections::USERS,
                user_id,
                &["playlists", playlist_id],
                json!({ "active": active }),
            )
            .await?;

        tracing::info!(user_id, playlist_id, active, "Changed playlist activity");
        Ok(())
    }

    /// Set a record's `updated` timestamp to now.
    pub async fn touch_updated(&self, user_id: &str, playlist_id: &str) -> Result<(), AppError> {
        self.store
            .update_field(
                collections::USERS,
                user_id,
                &["playlists", playlist_id],
                json!({ "updated": now_millis() }),
            )
            .await
    }

    // ─── Sweep Support ───────────────────────────────────────────

    /// Walk every stored record.
    ///
    /// `active_only` keeps records that are active and carry both
    /// timestamps; `due_only` additionally keeps records whose refresh
    /// window has elapsed (with one hour of lenience). Each surviving
    /// entry is enriched with its artist links; entries whose record
    /// document is missing are logged and dropped. A playlist id pointed
    /// at by two different users is a data-integrity fault.
    pub async fn all_playlists(
        &self,
        active_only: bool,
        due_only: bool,
    ) -> Result<Vec<(String, PlaylistData)>, AppError> {
        let Some(Value::Object(users)) = self.store.get_all(collections::USERS).await? else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(String, PlaylistData)> = Vec::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for (user_id, user_node) in users {
            let Some(playlists) = user_node.get("playlists").and_then(Value::as_object) else {
                continue;
            };
            for (playlist_id, node) in playlists {
                if let Some(owner) = owners.insert(playlist_id.clone(), user_id.clone()) {
                    return Err(AppError::Conflict(format!(
                        "playlist {} is referenced by users {} and {}",
                        playlist_id, owner, user_id
                    )));
                }
                entries.push((
                    user_id.clone(),
                    PlaylistData {
                        id: playlist_id.clone(),
                        metadata: parse_metadata(node),
                        artists: Vec::new(),
                    },
                ));
            }
        }

        if active_only {
            entries.retain(|(_, p)| {
                p.metadata.active && p.metadata.updated != 0 && p.metadata.frequency != 0
            });
        }

        if due_only {
            let now = now_millis();
            entries.retain(|(_, p)| {
                let expiration = p.metadata.updated + i64::from(p.metadata.frequency) * DAY_MS
                    - REFRESH_LENIENCE_MS;
                now > expiration
            });
        }

        // enrich with artist links, dropping entries without a record
        let mut enriched = Vec::with_capacity(entries.len());
        for (user_id, mut playlist) in entries {
            match self.playlist_artists(&playlist.id, &user_id).await {
                Ok(artists) => {
                    playlist.artists = artists;
                    enriched.push((user_id, playlist));
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        playlist_id = %playlist.id,
                        error = %e,
                        "Skipping playlist without a readable record"
                    );
                }
            }
        }

        Ok(enriched)
    }

    /// Read one playlist's user-side metadata; `NotFound` if absent.
    async fn metadata(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<PlaylistMetadata, AppError> {
        let node = self
            .store
            .get_field(collections::USERS, user_id, &["playlists", playlist_id])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playlist {}", playlist_id)))?;
        Ok(parse_metadata(&node))
    }
}

/// Drop links that request no tracks.
fn valid_links(artists: &[ArtistLink]) -> Vec<ArtistLink> {
    artists.iter().filter(|a| a.number >= 1).cloned().collect()
}

/// Lenient metadata read: older records may miss individual fields.
fn parse_metadata(node: &Value) -> PlaylistMetadata {
    PlaylistMetadata {
        updated: node.get("updated").and_then(Value::as_i64).unwrap_or(0),
        created: node.get("created").and_then(Value::as_i64).unwrap_or(0),
        active: node.get("active").and_then(Value::as_bool).unwrap_or(false),
        frequency: node
            .get("frequency")
            .and_then(Value::as_u64)
            .map(|f| f as u32)
            .unwrap_or(0),
    }
}
