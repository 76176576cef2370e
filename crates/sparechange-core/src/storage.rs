// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Storage collaborator
//!
//! The host keeps plugin data as opaque JSON blobs, each one under a single
//! root key. `put` only stages the value: nothing is durable until `flush`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("storage backend: {0}")]
    Backend(String),
}

#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Get the value of `root` (staged values included)
    async fn get(&self, root: &str) -> Result<Option<Value>, Error>;

    /// Stage a new value for `root`
    async fn put(&self, root: &str, value: Value) -> Result<(), Error>;

    /// Remove `root` and everything under it
    async fn remove(&self, root: &str) -> Result<(), Error>;

    /// Make staged values durable
    async fn flush(&self) -> Result<(), Error>;
}

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    staged: Arc<RwLock<HashMap<String, Value>>>,
    flushed: Arc<RwLock<HashMap<String, Value>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value as of the last flush
    pub fn flushed(&self, root: &str) -> Option<Value> {
        self.flushed.read().get(root).cloned()
    }

    /// Number of flushes so far
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, root: &str) -> Result<Option<Value>, Error> {
        Ok(self.staged.read().get(root).cloned())
    }

    async fn put(&self, root: &str, value: Value) -> Result<(), Error> {
        self.staged.write().insert(root.to_string(), value);
        Ok(())
    }

    async fn remove(&self, root: &str) -> Result<(), Error> {
        self.staged.write().remove(root);
        self.flushed.write().remove(root);
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let staged = self.staged.read().clone();
        *self.flushed.write() = staged;
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
