// SPDX-License-Identifier: MIT

//! Background reconciliation sweeps.
//!
//! Two sweeps keep stored records and the actual Spotify playlists in
//! agreement:
//! - the refresh sweep regenerates the tracks of every active record
//!   whose refresh window has elapsed
//! - the check sweep prunes records for playlists the user no longer
//!   follows, repairs generated titles and descriptions, and relinks
//!   artist entries whose canonical source playlist disappeared
//!
//! Both sweeps run sequentially and treat every record as its own unit
//! of work; one broken record never stops the rest of the sweep.

use crate::db::PlaylistRecordStore;
use crate::error::AppError;
use crate::models::PlaylistData;
use crate::services::generation::PlaylistGenerator;
use crate::services::resolver::CanonicalPlaylistResolver;
use crate::services::selection::{looks_generated_description, looks_generated_title};
use crate::services::spotify::SpotifyApi;
use crate::services::token_cache::TokenCache;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// What the check sweep should look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Repair generated titles and descriptions.
    pub details: bool,
    /// Re-resolve artist links whose source playlist is gone.
    pub artists: bool,
    /// Also rewrite details that merely look stale, not just broken ones.
    pub force: bool,
}

/// Tally of a refresh sweep.
#[derive(Debug, Default, Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

/// Tally of a check sweep.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub removed: usize,
    pub repaired: usize,
    pub failed: usize,
}

enum CheckAction {
    Kept,
    Removed,
    Repaired,
}

/// Engine driving the reconciliation sweeps.
#[derive(Clone)]
pub struct ReconciliationEngine {
    spotify: Arc<dyn SpotifyApi>,
    records: PlaylistRecordStore,
    tokens: TokenCache,
    generator: PlaylistGenerator,
    resolver: CanonicalPlaylistResolver,
}

impl ReconciliationEngine {
    pub fn new(
        spotify: Arc<dyn SpotifyApi>,
        records: PlaylistRecordStore,
        tokens: TokenCache,
        generator: PlaylistGenerator,
        resolver: CanonicalPlaylistResolver,
    ) -> Self {
        Self {
            spotify,
            records,
            tokens,
            generator,
            resolver,
        }
    }

    /// Regenerate every active record whose refresh window has elapsed.
    pub async fn refresh_all(&self) -> Result<RefreshReport, AppError> {
        let due = self.records.all_playlists(true, true).await?;
        let mut report = RefreshReport::default();

        for (user_id, playlist) in due {
            match self.refresh_one(&user_id, &playlist).await {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        user_id,
                        playlist_id = %playlist.id,
                        error = %e,
                        "Refresh sweep failed for playlist"
                    );
                }
            }
        }

        tracing::info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "Refresh sweep finished"
        );
        Ok(report)
    }

    /// Check every stored record against the live Spotify state.
    pub async fn check_all(&self, options: CheckOptions) -> Result<CheckReport, AppError> {
        let all = self.records.all_playlists(false, false).await?;

        // group by user so each user's token is resolved once
        let mut by_user: HashMap<String, Vec<PlaylistData>> = HashMap::new();
        for (user_id, playlist) in all {
            by_user.entry(user_id).or_default().push(playlist);
        }

        let mut report = CheckReport::default();
        for (user_id, playlists) in by_user {
            let credentials = match self.user_credentials(&user_id).await {
                Ok(credentials) => credentials,
                Err(e) => {
                    report.failed += playlists.len();
                    tracing::warn!(
                        user_id,
                        error = %e,
                        "Check sweep cannot authenticate user, skipping their playlists"
                    );
                    continue;
                }
            };
            let (access_token, username) = credentials;

            for playlist in playlists {
                report.checked += 1;
                match self
                    .check_one(&access_token, &username, &user_id, &playlist, options)
                    .await
                {
                    Ok(CheckAction::Kept) => {}
                    Ok(CheckAction::Removed) => report.removed += 1,
                    Ok(CheckAction::Repaired) => report.repaired += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            user_id,
                            playlist_id = %playlist.id,
                            error = %e,
                            "Check sweep failed for playlist"
                        );
                    }
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            removed = report.removed,
            repaired = report.repaired,
            failed = report.failed,
            "Check sweep finished"
        );
        Ok(report)
    }

    async fn refresh_one(&self, user_id: &str, playlist: &PlaylistData) -> Result<(), AppError> {
        let access_token = self.tokens.access_token(user_id).await?;
        self.generator
            .regenerate_tracks(&access_token, &playlist.id, &playlist.artists)
            .await?;
        self.records.touch_updated(user_id, &playlist.id).await
    }

    async fn user_credentials(&self, user_id: &str) -> Result<(String, String), AppError> {
        let access_token = self.tokens.access_token(user_id).await?;
        let username = self.tokens.username(user_id).await?;
        Ok((access_token, username))
    }

    async fn check_one(
        &self,
        access_token: &str,
        username: &str,
        user_id: &str,
        playlist: &PlaylistData,
        options: CheckOptions,
    ) -> Result<CheckAction, AppError> {
        let following = self
            .spotify
            .is_following(access_token, &playlist.id, &[username])
            .await?;
        if !following.first().copied().unwrap_or(false) {
            // unfollowing is how users delete playlists on their end
            self.records.remove_playlist(&playlist.id, user_id).await?;
            tracing::info!(user_id, playlist_id = %playlist.id, "Removed unfollowed playlist");
            return Ok(CheckAction::Removed);
        }

        let mut repaired = false;
        if options.details {
            repaired |= self
                .repair_details(access_token, playlist, options.force)
                .await?;
        }
        if options.artists {
            repaired |= self.repair_artist_links(access_token, playlist).await?;
        }

        if repaired {
            Ok(CheckAction::Repaired)
        } else {
            Ok(CheckAction::Kept)
        }
    }

    /// Rewrite a playlist's generated title and description when broken.
    ///
    /// An empty description is always repaired (Spotify drops descriptions
    /// now and then). Details that still look generated are only rewritten
    /// under `force`, so hand-edited titles survive the sweep.
    async fn repair_details(
        &self,
        access_token: &str,
        playlist: &PlaylistData,
        force: bool,
    ) -> Result<bool, AppError> {
        let details = self
            .spotify
            .playlist_details(access_token, &playlist.id)
            .await?;

        let description_flag = details.description.is_empty()
            || (force && looks_generated_description(&details.description));
        let title_flag = force && looks_generated_title(&details.name);

        if !title_flag && !description_flag {
            return Ok(false);
        }

        // use the artists' current names, not the ones stored at creation
        let ids: Vec<String> = playlist.artists.iter().map(|a| a.id.clone()).collect();
        let names: Vec<String> = self
            .spotify
            .artists(access_token, &ids)
            .await?
            .into_iter()
            .map(|a| a.name)
            .collect();

        self.generator
            .regenerate_details(
                access_token,
                &playlist.id,
                &names,
                title_flag,
                description_flag,
            )
            .await?;

        tracing::info!(
            playlist_id = %playlist.id,
            title_flag,
            description_flag,
            "Repaired playlist details"
        );
        Ok(true)
    }

    /// Re-resolve artist links whose canonical source playlist is gone.
    ///
    /// A link that cannot be re-resolved is left untouched; the generator
    /// already skips unreadable sources, so a dead link costs tracks but
    /// never fails a refresh.
    async fn repair_artist_links(
        &self,
        access_token: &str,
        playlist: &PlaylistData,
    ) -> Result<bool, AppError> {
        let mut links = playlist.artists.clone();
        let mut changed = false;

        for link in &mut links {
            match self
                .spotify
                .playlist_details(access_token, &link.playlist)
                .await
            {
                Ok(_) => continue,
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(_) => {}
            }

            let artist_uri = format!("spotify:artist:{}", link.id);
            match self
                .resolver
                .find_canonical_playlist(access_token, &link.name, &artist_uri, true)
                .await?
            {
                Some(new_playlist) => {
                    tracing::info!(
                        artist_id = %link.id,
                        old = %link.playlist,
                        new = %new_playlist,
                        "Relinked artist to new canonical playlist"
                    );
                    link.playlist = new_playlist;
                    changed = true;
                }
                None => {
                    tracing::warn!(
                        artist_id = %link.id,
                        playlist_id = %playlist.id,
                        "Artist link is dead and could not be re-resolved"
                    );
                }
            }
        }

        if changed {
            self.records
                .set_playlist_artists(&playlist.id, &links)
                .await?;
        }
        Ok(changed)
    }
}
