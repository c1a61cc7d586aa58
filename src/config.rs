// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; there is no runtime reloading.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// Redirect URI registered with Spotify for the OAuth callback
    pub spotify_redirect_uri: String,
    /// Firebase Realtime Database base URL
    pub firebase_url: String,
    /// Optional auth token appended to RTDB REST requests
    pub firebase_auth: Option<String>,
    /// Shared secret required by the batch endpoints
    pub batch_secret: String,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_client_secret: "test_secret".to_string(),
            spotify_redirect_uri: "http://localhost:8080/login/callback".to_string(),
            firebase_url: "http://localhost:9000".to_string(),
            firebase_auth: None,
            batch_secret: "test_batch_secret".to_string(),
            frontend_url: "http://localhost:4200".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("SPOTIFY_REDIRECT_URI"))?,
            firebase_url: env::var("FIREBASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_URL"))?,
            firebase_auth: env::var("FIREBASE_AUTH").ok(),
            batch_secret: env::var("BATCH_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BATCH_SECRET"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("SPOTIFY_CLIENT_ID", "test_id");
        env::set_var("SPOTIFY_CLIENT_SECRET", "test_secret");
        env::set_var("SPOTIFY_REDIRECT_URI", "http://localhost/cb");
        env::set_var("FIREBASE_URL", "http://localhost:9000/");
        env::set_var("BATCH_SECRET", "s3cret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.spotify_client_id, "test_id");
        assert_eq!(config.firebase_url, "http://localhost:9000");
        assert_eq!(config.port, 8080);
    }
}
