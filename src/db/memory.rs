// SPDX-License-Identifier: MIT

//! In-memory key-value store.
//!
//! Implements the same path semantics as [`crate::db::FirebaseStore`]
//! against a JSON tree behind an `RwLock`. Used by the integration tests
//! and for running the server without a database.

use crate::db::store::KeyValueStore;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// JSON-tree store with no persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    root: Arc<RwLock<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(Value::Object(Map::new()))),
        }
    }

    /// Walk to a node, returning a clone if present.
    fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
        let mut node = root;
        for segment in segments {
            node = node.as_object()?.get(*segment)?;
        }
        Some(node)
    }

    /// Walk to a node, creating intermediate objects along the way.
    fn lookup_mut<'a>(root: &'a mut Value, segments: &[&str]) -> &'a mut Value {
        let mut node = root;
        for segment in segments {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .expect("node was just made an object")
                .entry(segment.to_string())
                .or_insert(Value::Object(Map::new()));
        }
        node
    }

    /// Remove the node at the given path, pruning nothing else.
    fn remove(root: &mut Value, segments: &[&str]) {
        let Some((last, parents)) = segments.split_last() else {
            *root = Value::Object(Map::new());
            return;
        };
        let mut node = root;
        for segment in parents {
            match node.as_object_mut().and_then(|o| o.get_mut(*segment)) {
                Some(next) => node = next,
                None => return,
            }
        }
        if let Some(obj) = node.as_object_mut() {
            obj.remove(*last);
        }
    }

    /// Shallow-merge `data`'s children into the node at the given path.
    fn merge(root: &mut Value, segments: &[&str], data: Value) {
        let node = Self::lookup_mut(root, segments);
        match data {
            Value::Object(entries) => {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                let obj = node.as_object_mut().expect("merge target is an object");
                for (key, value) in entries {
                    obj.insert(key, value);
                }
            }
            other => *node = other,
        }
    }

    fn segments<'a>(collection: &'a str, id: &'a str, path: &'a [&str]) -> Vec<&'a str> {
        let mut segments = vec![collection, id];
        segments.extend_from_slice(path);
        segments
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn create(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        *Self::lookup_mut(&mut root, &[collection, id]) = data;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let root = self.root.read().await;
        Ok(Self::lookup(&root, &[collection, id]).cloned())
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        Self::merge(&mut root, &[collection, id], data);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        Self::remove(&mut root, &[collection, id]);
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Option<Value>, AppError> {
        let root = self.root.read().await;
        Ok(Self::lookup(&root, &[collection])
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .cloned())
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        *Self::lookup_mut(&mut root, &Self::segments(collection, id, path)) = data;
        Ok(())
    }

    async fn get_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<Option<Value>, AppError> {
        let root = self.root.read().await;
        Ok(Self::lookup(&root, &Self::segments(collection, id, path)).cloned())
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
        data: Value,
    ) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        Self::merge(&mut root, &Self::segments(collection, id, path), data);
        Ok(())
    }

    async fn delete_field(
        &self,
        collection: &str,
        id: &str,
        path: &[&str],
    ) -> Result<(), AppError> {
        let mut root = self.root.write().await;
        Self::remove(&mut root, &Self::segments(collection, id, path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn field_ops_address_nested_nodes() {
        let store = MemoryStore::new();
        store
            .create("users", "u1", json!({ "spotifyRefresh": "r" }))
            .await
            .unwrap();
        store
            .set_field("users", "u1", &["playlists", "p1"], json!({ "active": true }))
            .await
            .unwrap();

        let node = store
            .get_field("users", "u1", &["playlists", "p1", "active"])
            .await
            .unwrap();
        assert_eq!(node, Some(json!(true)));

        store
            .update_field("users", "u1", &["playlists", "p1"], json!({ "active": false }))
            .await
            .unwrap();
        let node = store.get_field("users", "u1", &["playlists", "p1"]).await.unwrap();
        assert_eq!(node, Some(json!({ "active": false })));

        store
            .delete_field("users", "u1", &["playlists", "p1"])
            .await
            .unwrap();
        assert_eq!(
            store.get_field("users", "u1", &["playlists", "p1"]).await.unwrap(),
            None
        );
        // siblings untouched
        assert_eq!(
            store.get_field("users", "u1", &["spotifyRefresh"]).await.unwrap(),
            Some(json!("r"))
        );
    }

    #[tokio::test]
    async fn update_merges_instead_of_replacing() {
        let store = MemoryStore::new();
        store.create("users", "u1", json!({ "a": 1, "b": 2 })).await.unwrap();
        store.update("users", "u1", json!({ "b": 3 })).await.unwrap();
        assert_eq!(
            store.get("users", "u1").await.unwrap(),
            Some(json!({ "a": 1, "b": 3 }))
        );
    }
}
