// SPDX-License-Identifier: MIT

//! Tunemash API Server
//!
//! Combines the canonical "This is ..." playlists of several artists
//! into auto-generated, periodically refreshed Spotify playlists.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunemash::{
    config::Config,
    db::{FirebaseStore, PlaylistRecordStore},
    routes::auth::LoginStates,
    services::{
        CanonicalPlaylistResolver, PlaylistGenerator, ReconciliationEngine, SpotifyClient,
        TokenCache,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Tunemash API");

    // Record store over the Firebase Realtime Database
    let store = Arc::new(FirebaseStore::new(
        &config.firebase_url,
        config.firebase_auth.clone(),
    ));
    let records = PlaylistRecordStore::new(store);

    // Spotify client and the services built on top of it
    let spotify = Arc::new(SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_redirect_uri.clone(),
    ));
    let tokens = TokenCache::new(spotify.clone(), records.clone());
    let resolver = CanonicalPlaylistResolver::new(spotify.clone());
    let generator = PlaylistGenerator::new(spotify.clone());
    let reconciliation = ReconciliationEngine::new(
        spotify.clone(),
        records.clone(),
        tokens.clone(),
        generator.clone(),
        resolver.clone(),
    );
    tracing::info!("Services initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        records,
        tokens,
        spotify,
        resolver,
        generator,
        reconciliation,
        login_states: LoginStates::new(),
    });

    // Build router
    let app = tunemash::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tunemash=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
