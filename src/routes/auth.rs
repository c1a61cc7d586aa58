// SPDX-License-Identifier: MIT

//! Spotify OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;

const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const OAUTH_SCOPES: &str = "playlist-modify-public playlist-modify-private playlist-read-private";
/// How long an issued OAuth state stays valid.
const STATE_TTL_SECS: i64 = 5 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/login/callback", get(login_callback))
        .route("/auth", post(check_auth))
}

/// One outstanding OAuth state.
struct StateEntry {
    expires_at: DateTime<Utc>,
    /// Removes the state after its TTL if the callback never arrives.
    eviction: JoinHandle<()>,
}

impl Drop for StateEntry {
    fn drop(&mut self) {
        self.eviction.abort();
    }
}

/// Short-TTL arena of outstanding OAuth states.
///
/// States are single-use: the callback consumes its state, and a state
/// that is never consumed evicts itself after five minutes.
#[derive(Clone, Default)]
pub struct LoginStates {
    states: Arc<DashMap<String, StateEntry>>,
}

impl LoginStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh state and arm its eviction timer.
    pub fn issue(&self) -> String {
        let state = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::seconds(STATE_TTL_SECS);

        let states = Arc::clone(&self.states);
        let key = state.clone();
        let eviction = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(STATE_TTL_SECS as u64)).await;
            states.remove_if(&key, |_, entry| Utc::now() >= entry.expires_at);
        });

        self.states.insert(
            state.clone(),
            StateEntry {
                expires_at,
                eviction,
            },
        );
        state
    }

    /// Consume a state; true if it was outstanding and unexpired.
    pub fn consume(&self, state: &str) -> bool {
        match self.states.remove(state) {
            Some((_, entry)) => Utc::now() < entry.expires_at,
            None => false,
        }
    }
}

/// Start the OAuth flow - redirect to the Spotify authorization page.
async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    let oauth_state = state.login_states.issue();

    let auth_url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        SPOTIFY_AUTHORIZE_URL,
        urlencoding::encode(&state.config.spotify_client_id),
        urlencoding::encode(&state.config.spotify_redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        oauth_state
    );

    tracing::info!("Starting OAuth flow, redirecting to Spotify");
    Redirect::temporary(&auth_url)
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code, mint a user id, store the token.
async fn login_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let frontend_url = &state.config.frontend_url;

    if !state.login_states.consume(&params.state) {
        tracing::warn!("OAuth callback with unknown or expired state");
        let redirect = format!("{}?error=invalid_state", frontend_url);
        return Ok(Redirect::temporary(&redirect));
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let tokens = state.spotify.exchange_code(&code).await?;

    let user_id = Uuid::new_v4().to_string();
    state.records.add_user(&user_id).await?;
    state
        .records
        .set_refresh_token(&user_id, &tokens.refresh_token)
        .await?;

    tracing::info!(user_id, "OAuth successful, refresh token stored");

    let redirect = format!("{}/callback?user={}", frontend_url, user_id);
    Ok(Redirect::temporary(&redirect))
}

#[derive(Deserialize)]
pub struct AuthRequest {
    pub user: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub authenticated: bool,
}

/// Check that a user id is known to the service.
async fn check_auth(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthResponse>> {
    let authenticated = state.records.user_exists(&request.user).await?;
    Ok(Json(AuthResponse { authenticated }))
}
