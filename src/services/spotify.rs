// SPDX-License-Identifier: MIT

//! Spotify Web API client.
//!
//! Handles:
//! - OAuth code exchange and access-token refresh
//! - Artist and playlist search
//! - Playlist reads (details, paginated tracks, follow status)
//! - Playlist writes (create, replace/append tracks, details)
//! - Rate limit and invalid-token detection

use crate::error::AppError;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

const ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Result of exchanging an authorization code.
#[derive(Debug, Clone)]
pub struct TokenExchange {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Result of refreshing an access token.
#[derive(Debug, Clone)]
pub struct TokenRefresh {
    pub access_token: String,
    pub expires_in: i64,
}

/// Artist as returned by search and lookup endpoints.
#[derive(Debug, Clone)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub images: Vec<String>,
    pub popularity: u32,
    pub followers: u64,
}

/// Playlist summary from search results.
#[derive(Debug, Clone)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

/// Playlist metadata from a details read.
#[derive(Debug, Clone)]
pub struct PlaylistDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
}

/// One track entry of a playlist page.
#[derive(Debug, Clone)]
pub struct PlaylistTrack {
    pub uri: String,
    /// URIs of the credited artists, used by the deep canonical check
    pub artist_uris: Vec<String>,
}

/// One page of a playlist's tracks.
#[derive(Debug, Clone)]
pub struct TracksPage {
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
    pub items: Vec<PlaylistTrack>,
}

impl TracksPage {
    /// Tracks left after this page.
    pub fn remaining(&self) -> i64 {
        i64::from(self.total) - i64::from(self.offset) - i64::from(self.limit)
    }
}

/// Operation contract of the external music service.
///
/// All calls take an explicit access token; credential caching lives in
/// [`crate::services::token_cache::TokenCache`], not here.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenExchange, AppError>;

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRefresh, AppError>;

    /// Username (Spotify id) of the token's owner.
    async fn current_username(&self, access_token: &str) -> Result<String, AppError>;

    async fn search_artists(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Artist>, AppError>;

    async fn search_playlists(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistSummary>, AppError>;

    async fn playlist_details(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, AppError>;

    /// One page of a playlist's tracks starting at `offset`.
    async fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<TracksPage, AppError>;

    /// Follow status of `user_ids` for a playlist, in input order.
    async fn is_following(
        &self,
        access_token: &str,
        playlist_id: &str,
        user_ids: &[&str],
    ) -> Result<Vec<bool>, AppError>;

    /// Create an empty playlist for `username`, returning its id.
    async fn create_playlist(
        &self,
        access_token: &str,
        username: &str,
        title: &str,
        description: &str,
    ) -> Result<String, AppError>;

    /// Replace the playlist's contents with `uris` (at most 100).
    async fn replace_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError>;

    /// Append `uris` (at most 100) to the playlist.
    async fn append_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError>;

    async fn update_playlist_details(
        &self,
        access_token: &str,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), AppError>;

    /// Artist details by id; the client batches requests of at most 50.
    async fn artists(&self, access_token: &str, ids: &[String]) -> Result<Vec<Artist>, AppError>;
}

/// Spotify Web API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    /// Create a new client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.spotify.com/v1".to_string(),
            token_url: ACCOUNTS_TOKEN_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// `Basic` authorization header for the accounts endpoint.
    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    /// POST to the accounts token endpoint.
    ///
    /// A 4xx here means Spotify rejected the credential itself, which is
    /// an auth failure rather than a service error.
    async fn token_request<T: for<'de> Deserialize<'de>>(
        &self,
        form: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .header("Authorization", self.basic_auth())
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Spotify rejected credential");
            return Err(AppError::AuthFailure);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SpotifyApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("JSON parse error: {}", e)))
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Spotify rate limit hit (429)");
            return Err(AppError::SpotifyApi(AppError::SPOTIFY_RATE_LIMIT.to_string()));
        }

        if status.as_u16() == 401 {
            return Err(AppError::SpotifyApi(AppError::SPOTIFY_TOKEN_ERROR.to_string()));
        }

        Err(AppError::SpotifyApi(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Spotify rate limit hit (429)");
                return Err(AppError::SpotifyApi(AppError::SPOTIFY_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::SpotifyApi(AppError::SPOTIFY_TOKEN_ERROR.to_string()));
            }

            return Err(AppError::SpotifyApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SpotifyApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenExchange, AppError> {
        let body: WireTokenResponse = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        let refresh_token = body
            .refresh_token
            .ok_or_else(|| AppError::SpotifyApi("Token exchange without refresh token".into()))?;

        Ok(TokenExchange {
            access_token: body.access_token,
            refresh_token,
            expires_in: body.expires_in,
        })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRefresh, AppError> {
        let body: WireTokenResponse = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        Ok(TokenRefresh {
            access_token: body.access_token,
            expires_in: body.expires_in,
        })
    }

    async fn current_username(&self, access_token: &str) -> Result<String, AppError> {
        let url = format!("{}/me", self.base_url);
        let body: WireProfile = self.get_json(&url, access_token, &[]).await?;
        Ok(body.id)
    }

    async fn search_artists(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Artist>, AppError> {
        let url = format!("{}/search", self.base_url);
        let body: WireSearchArtists = self
            .get_json(
                &url,
                access_token,
                &[
                    ("q", query.to_string()),
                    ("type", "artist".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(body.artists.items.into_iter().map(Artist::from).collect())
    }

    async fn search_playlists(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<PlaylistSummary>, AppError> {
        let url = format!("{}/search", self.base_url);
        let body: WireSearchPlaylists = self
            .get_json(
                &url,
                access_token,
                &[
                    ("q", query.to_string()),
                    ("type", "playlist".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        // search pages may contain null placeholder entries
        Ok(body
            .playlists
            .items
            .into_iter()
            .flatten()
            .map(|p| PlaylistSummary {
                id: p.id,
                name: p.name,
                owner_id: p.owner.id,
            })
            .collect())
    }

    async fn playlist_details(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, AppError> {
        let url = format!("{}/playlists/{}", self.base_url, playlist_id);
        let body: WirePlaylist = self
            .get_json(
                &url,
                access_token,
                &[("fields", "id,name,description,images".to_string())],
            )
            .await?;

        Ok(PlaylistDetails {
            id: body.id,
            name: body.name,
            description: body.description.unwrap_or_default(),
            images: body
                .images
                .unwrap_or_default()
                .into_iter()
                .map(|i| i.url)
                .collect(),
        })
    }

    async fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<TracksPage, AppError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        let mut query = vec![
            ("offset", offset.to_string()),
            (
                "fields",
                "total,limit,offset,items(track(uri,artists.uri))".to_string(),
            ),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let body: WireTracksPage = self.get_json(&url, access_token, &query).await?;

        Ok(TracksPage {
            total: body.total,
            limit: body.limit,
            offset: body.offset,
            items: body
                .items
                .into_iter()
                .filter_map(|item| item.track)
                .map(|track| PlaylistTrack {
                    uri: track.uri,
                    artist_uris: track
                        .artists
                        .unwrap_or_default()
                        .into_iter()
                        .map(|a| a.uri)
                        .collect(),
                })
                .collect(),
        })
    }

    async fn is_following(
        &self,
        access_token: &str,
        playlist_id: &str,
        user_ids: &[&str],
    ) -> Result<Vec<bool>, AppError> {
        let url = format!(
            "{}/playlists/{}/followers/contains",
            self.base_url, playlist_id
        );
        let body: Vec<bool> = self
            .get_json(&url, access_token, &[("ids", user_ids.join(","))])
            .await?;

        if body.len() != user_ids.len() {
            return Err(AppError::SpotifyApi(
                "Unexpected reply when asking for the following status".to_string(),
            ));
        }
        Ok(body)
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        username: &str,
        title: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/users/{}/playlists", self.base_url, username);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "name": title,
                "description": description,
                "public": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(e.to_string()))?;

        let body: WirePlaylist = self.check_response_json(response).await?;
        Ok(body.id)
    }

    async fn replace_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(e.to_string()))?;
        self.check_response(response).await
    }

    async fn append_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), AppError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(e.to_string()))?;
        self.check_response(response).await
    }

    async fn update_playlist_details(
        &self,
        access_token: &str,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), AppError> {
        let url = format!("{}/playlists/{}", self.base_url, playlist_id);

        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_string(), name.into());
        }
        if let Some(description) = description {
            body.insert("description".to_string(), description.into());
        }

        let response = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::SpotifyApi(e.to_string()))?;
        self.check_response(response).await
    }

    async fn artists(&self, access_token: &str, ids: &[String]) -> Result<Vec<Artist>, AppError> {
        let url = format!("{}/artists", self.base_url);
        let mut artists = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(50) {
            let body: WireArtists = self
                .get_json(&url, access_token, &[("ids", chunk.join(","))])
                .await?;
            artists.extend(body.artists.into_iter().map(Artist::from));
        }

        Ok(artists)
    }
}

// ─── Wire Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireTokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct WireProfile {
    id: String,
}

#[derive(Deserialize)]
struct WireImage {
    url: String,
}

#[derive(Deserialize)]
struct WireFollowers {
    total: u64,
}

#[derive(Deserialize)]
struct WireArtist {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    images: Vec<WireImage>,
    #[serde(default)]
    popularity: u32,
    followers: Option<WireFollowers>,
}

impl From<WireArtist> for Artist {
    fn from(artist: WireArtist) -> Self {
        Artist {
            id: artist.id,
            name: artist.name,
            uri: artist.uri,
            images: artist.images.into_iter().map(|i| i.url).collect(),
            popularity: artist.popularity,
            followers: artist.followers.map(|f| f.total).unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
struct WireArtists {
    artists: Vec<WireArtist>,
}

#[derive(Deserialize)]
struct WirePage<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct WireSearchArtists {
    artists: WirePage<WireArtist>,
}

#[derive(Deserialize)]
struct WireOwner {
    id: String,
}

#[derive(Deserialize)]
struct WirePlaylistSummary {
    id: String,
    name: String,
    owner: WireOwner,
}

#[derive(Deserialize)]
struct WireSearchPlaylists {
    playlists: WirePage<Option<WirePlaylistSummary>>,
}

#[derive(Deserialize)]
struct WirePlaylist {
    id: String,
    #[serde(default)]
    name: String,
    description: Option<String>,
    images: Option<Vec<WireImage>>,
}

#[derive(Deserialize)]
struct WireTrackArtist {
    uri: String,
}

#[derive(Deserialize)]
struct WireTrack {
    uri: String,
    artists: Option<Vec<WireTrackArtist>>,
}

#[derive(Deserialize)]
struct WireTrackItem {
    track: Option<WireTrack>,
}

#[derive(Deserialize)]
struct WireTracksPage {
    total: u32,
    limit: u32,
    offset: u32,
    items: Vec<WireTrackItem>,
}
