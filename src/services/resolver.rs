// SPDX-License-Identifier: MIT

//! Canonical ("This is ...") playlist resolution.
//!
//! Spotify's curator account maintains one official playlist per artist,
//! titled `This is <artist>`. Search results for that literal title are
//! noisy — fan copies, renamed artists, similarly named acts — so
//! candidates are filtered by owner, ranked by name similarity, and
//! optionally deep-checked against the tracks' artist credits.

use crate::error::AppError;
use crate::services::spotify::{Artist, PlaylistSummary, SpotifyApi};
use std::sync::Arc;

/// Owner id of the official curator account.
const CURATOR_ID: &str = "spotify";
/// Title prefix of canonical playlists.
const TITLE_PREFIX: &str = "This is ";
/// Minimum similarity between artist name and candidate title.
const SIMILARITY_CUTOFF: f64 = 0.75;
/// Similarity above which another artist counts as a confusable name.
const ALTERNATIVE_CUTOFF: f64 = 0.7;
/// How many tracks the deep check samples.
const DEEP_CHECK_SAMPLE: u32 = 5;

/// Artist search result.
#[derive(Debug, Clone)]
pub struct ArtistSearch {
    pub query: String,
    pub artist: Option<ResolvedArtist>,
    pub error_reason: Option<String>,
}

/// An artist together with its resolved canonical playlist.
#[derive(Debug, Clone)]
pub struct ResolvedArtist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub images: Vec<String>,
    pub playlist: String,
}

/// Resolver for canonical per-artist playlists.
#[derive(Clone)]
pub struct CanonicalPlaylistResolver {
    spotify: Arc<dyn SpotifyApi>,
}

impl CanonicalPlaylistResolver {
    pub fn new(spotify: Arc<dyn SpotifyApi>) -> Self {
        Self { spotify }
    }

    /// Find the canonical playlist id for an artist, if one exists.
    ///
    /// `deep_check` additionally samples a handful of tracks and requires
    /// every one of them to credit `artist_uri`; used when confusable
    /// artist names exist and when relinking during reconciliation.
    pub async fn find_canonical_playlist(
        &self,
        access_token: &str,
        artist_name: &str,
        artist_uri: &str,
        deep_check: bool,
    ) -> Result<Option<String>, AppError> {
        if artist_name.is_empty() {
            return Ok(None);
        }

        let query = format!("{}{}", TITLE_PREFIX, artist_name);
        let candidates = self.spotify.search_playlists(access_token, &query, 3).await?;

        let Some(candidate) = best_candidate(&candidates, artist_name) else {
            return Ok(None);
        };

        if !deep_check {
            return Ok(Some(candidate.id.clone()));
        }

        let sample = self
            .spotify
            .playlist_tracks(access_token, &candidate.id, 0, Some(DEEP_CHECK_SAMPLE))
            .await?;
        let all_credited = sample
            .items
            .iter()
            .all(|track| track.artist_uris.iter().any(|uri| uri == artist_uri));

        if all_credited {
            Ok(Some(candidate.id.clone()))
        } else {
            tracing::debug!(
                artist_name,
                candidate = %candidate.id,
                "Deep check rejected canonical playlist candidate"
            );
            Ok(None)
        }
    }

    /// Search for an artist and resolve their canonical playlist.
    ///
    /// Irrelevant artists (too obscure to have a canonical playlist) and
    /// artists without one come back with a descriptive `error_reason`
    /// instead of an error.
    pub async fn search_artist(
        &self,
        access_token: &str,
        query: &str,
    ) -> Result<ArtistSearch, AppError> {
        let hits = self.spotify.search_artists(access_token, query, 1).await?;
        let Some(artist) = hits.into_iter().next().filter(is_relevant) else {
            return Ok(ArtistSearch {
                query: query.to_string(),
                artist: None,
                error_reason: Some("Could not find artist".to_string()),
            });
        };

        // confusable names force the deep check on the playlist lookup
        let alternatives = self
            .spotify
            .search_artists(access_token, &artist.name, 3)
            .await?;
        let confusable = alternatives.iter().any(|alt| {
            alt.id != artist.id
                && is_relevant(alt)
                && similarity(&artist.name, &alt.name) > ALTERNATIVE_CUTOFF
        });

        let playlist = self
            .find_canonical_playlist(access_token, &artist.name, &artist.uri, confusable)
            .await?;

        match playlist {
            Some(playlist) => Ok(ArtistSearch {
                query: query.to_string(),
                artist: Some(ResolvedArtist {
                    id: artist.id,
                    name: artist.name,
                    uri: artist.uri,
                    images: artist.images,
                    playlist,
                }),
                error_reason: None,
            }),
            None => Ok(ArtistSearch {
                query: query.to_string(),
                artist: None,
                error_reason: Some("Artist does not have a 'This Is' playlist".to_string()),
            }),
        }
    }
}

/// Relevance gate: only artists with real reach get canonical playlists.
fn is_relevant(artist: &Artist) -> bool {
    artist.images.len() >= 3 && artist.popularity >= 35 && artist.followers >= 5000
}

/// Pick the best canonical candidate for an artist name.
fn best_candidate<'a>(
    candidates: &'a [PlaylistSummary],
    artist_name: &str,
) -> Option<&'a PlaylistSummary> {
    let mut valid: Vec<(&PlaylistSummary, f64)> = candidates
        .iter()
        .filter(|candidate| candidate.owner_id == CURATOR_ID)
        .map(|candidate| {
            let title = strip_prefix(&candidate.name);
            (candidate, similarity(artist_name, title))
        })
        .filter(|(_, score)| *score >= SIMILARITY_CUTOFF)
        .collect();

    valid.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    valid.first().map(|(candidate, _)| *candidate)
}

/// Strip the canonical title prefix, tolerating arbitrary casing.
///
/// Titles in non-Latin scripts may not have a char boundary at the
/// prefix length; those cannot carry the prefix and pass through whole.
fn strip_prefix(title: &str) -> &str {
    match title.get(..TITLE_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(TITLE_PREFIX) => &title[TITLE_PREFIX.len()..],
        _ => title,
    }
}

/// Normalized string similarity in `[0, 1]`.
///
/// `1 - levenshtein(a, b) / max(len)`, case-insensitive; two empty
/// strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Classic two-row Levenshtein distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut costs: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut last = i;
        costs[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let new = if ca == cb {
                last
            } else {
                last.min(costs[j]).min(costs[j + 1]) + 1
            };
            last = costs[j + 1];
            costs[j + 1] = new;
        }
    }

    costs[b.len()]
}
