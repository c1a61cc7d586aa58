// SPDX-License-Identifier: MIT

//! Firebase Realtime Database adapter.
//!
//! Talks to the RTDB REST interface: a node at `a/b/c` maps to
//! `{base}/a/b/c.json` with PUT (set), GET, PATCH (merge) and DELETE.

use crate::db::store::KeyValueStore;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// RTDB-backed store.
#[derive(Clone)]
pub struct FirebaseStore {
    http: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl FirebaseStore {
    /// Create a store client for the given database URL.
    ///
    /// `auth` is an optional database secret or ID token appended to
    /// every request as the `auth` query parameter.
    pub fn new(base_url: &str, auth: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// Build the REST URL for a node.
    fn node_url(&self, collection: &str, id: &str, path: &[&str]) -> String {
        let mut url = format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(collection),
            urlencoding::encode(id)
        );
        for segment in path {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url.push_str(".json");
        if let Some(auth) = &self.auth {
            url.push_str("?auth=");
            url.push_str(auth);
        }
        url
    }

    fn collection_url(&self, collection: &str) -> String {
        let mut url = format!("{}/{}.json", self.base_url, urlencoding::encode(collection));
        if let Some(auth) = &self.auth {
            url.push_str("?auth=");
            url.push_str(auth);
        }
        url
    }

    /// Check response status and parse the JSON body.
    async fn read_response(&self, response: reqwest::Response) -> Result<Option<Value>, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Database(format!("RTDB HTTP {}: {}", status, body)));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("RTDB JSON parse error: {}", e)))?;

        // RTDB returns JSON null for absent nodes
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    /// Check a write response, discarding the echoed body.
    async fn check_write(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Database(format!("RTDB HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl KeyValueStore for FirebaseStore {
    async fn create(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError> {
        let response = self
            .http
            .put(self.node_url(collection, id, &[]))
            .json(&data)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let response = self
            .http
            .get(self.node_url(collection, id, &[]))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.read_response(response).await
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError> {
        let response = self
            .http
            .patch(self.node_url(collection, id, &[]))
            .json(&data)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let response = self
            .http
            .delete(self.node_url(collection, id, &[]))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }

    async fn get_all(&self, collection: &str) -> Result<Option<Value>, AppError> {
        let response = self
            .http
            .get(self.collection_url(collection))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.read_response(response).await
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .put(self.node_url(collection, id, path))
            .json(&data)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }

    async fn get_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<Option<Value>, AppError> {
        let response = self
            .http
            .get(self.node_url(collection, id, path))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.read_response(response).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .patch(self.node_url(collection, id, path))
            .json(&data)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }

    async fn delete_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<(), AppError> {
        let response = self
            .http
            .delete(self.node_url(collection, id, path))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.check_write(response).await
    }
}
