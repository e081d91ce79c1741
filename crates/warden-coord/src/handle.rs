//! Coordination handle capability surface
//!
//! Lock recipes only need `create`, `children`, `exists_watch` and `delete`.
//! The remaining operations exist for the node utilities in
//! [`helpers`](crate::helpers).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::node::{CreateMode, Stat};
use crate::watch::Watch;

/// A live connection to a hierarchical coordination service.
///
/// Paths are absolute (`/a/b`). Child listings return bare names, in no
/// guaranteed order.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Create a node and return its full path, which for sequential modes
    /// carries the service-assigned suffix.
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String>;

    /// Names of the direct children of `path`.
    async fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Existence check without a watch.
    async fn exists(&self, path: &str) -> Result<Option<Stat>>;

    /// Existence check that registers a one-shot watch in the same step.
    ///
    /// The watch is registered whether or not the node exists.
    async fn exists_watch(&self, path: &str) -> Result<(Option<Stat>, Watch)>;

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, Stat)>;

    /// Replace the node's data; `None` skips the version check.
    async fn set_data(&self, path: &str, data: &[u8], version: Option<i32>) -> Result<Stat>;

    /// Delete a childless node; `None` skips the version check.
    async fn delete(&self, path: &str, version: Option<i32>) -> Result<()>;
}

#[async_trait]
impl<T: Coordinator + ?Sized> Coordinator for Arc<T> {
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        (**self).create(path, data, mode).await
    }

    async fn children(&self, path: &str) -> Result<Vec<String>> {
        (**self).children(path).await
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>> {
        (**self).exists(path).await
    }

    async fn exists_watch(&self, path: &str) -> Result<(Option<Stat>, Watch)> {
        (**self).exists_watch(path).await
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, Stat)> {
        (**self).get_data(path).await
    }

    async fn set_data(&self, path: &str, data: &[u8], version: Option<i32>) -> Result<Stat> {
        (**self).set_data(path, data, version).await
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        (**self).delete(path, version).await
    }
}
