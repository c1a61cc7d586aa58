// SPDX-License-Identifier: MIT

//! Hierarchical key-value store abstraction.
//!
//! Nodes are addressed by `(collection, id)` plus an optional path of
//! nested field segments. The core only manipulates typed records through
//! [`crate::db::PlaylistRecordStore`]; this trait is the transport seam.

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// A hierarchical document store.
///
/// All operations are fallible and non-retryable from the caller's point
/// of view: a failed store call bubbles up as [`AppError::Database`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Set (replace) the node at `collection/id`.
    async fn create(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError>;

    /// Read the node at `collection/id`, `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError>;

    /// Merge `data`'s children into the node at `collection/id` (upsert).
    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError>;

    /// Remove the node at `collection/id`.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    /// Read an entire collection, `None` if it is empty or absent.
    async fn get_all(&self, collection: &str) -> Result<Option<Value>, AppError>;

    /// Set (replace) the sub-tree at `collection/id/path...`.
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError>;

    /// Read the sub-tree at `collection/id/path...`, `None` if absent.
    async fn get_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<Option<Value>, AppError>;

    /// Merge `data`'s children into the sub-tree at `collection/id/path...`.
    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError>;

    /// Remove the sub-tree at `collection/id/path...`.
    async fn delete_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<(), AppError>;
}
