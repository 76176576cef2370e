// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sparechange_core::storage::{Error as StorageError, StorageBackend};

use super::{Error, Store};

impl Store {
    /// Get the durable value of `root`
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn get_plugin_data(&self, root: String) -> Result<Value, Error> {
        let conn = self.acquire().await?;
        conn.interact(move |conn| {
            let mut stmt = conn.prepare_cached("SELECT data FROM plugin_data WHERE root = ?;")?;
            let mut rows = stmt.query([root.as_str()])?;
            let row = rows
                .next()?
                .ok_or_else(|| Error::NotFound(format!("plugin data '{root}'")))?;
            let data: String = row.get(0)?;
            Ok(serde_json::from_str(&data)?)
        })
        .await?
    }

    /// Save many roots in a single transaction
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn save_plugin_data(&self, data: HashMap<String, Value>) -> Result<(), Error> {
        let conn = self.acquire().await?;
        conn.interact(move |conn| {
            let tx = conn.transaction()?;
            for (root, value) in data.into_iter() {
                let value: String = serde_json::to_string(&value)?;
                tx.execute(
                    "INSERT INTO plugin_data (root, data) VALUES (?, ?) ON CONFLICT(root) DO UPDATE SET data = ?;",
                    (root.as_str(), value.as_str(), value.as_str()),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?
    }

    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn delete_plugin_data(&self, root: String) -> Result<(), Error> {
        let conn = self.acquire().await?;
        conn.interact(move |conn| {
            conn.execute("DELETE FROM plugin_data WHERE root = ?;", [root.as_str()])?;
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl StorageBackend for Store {
    async fn get(&self, root: &str) -> Result<Option<Value>, StorageError> {
        if let Some(value) = self.staged.read().await.get(root) {
            return Ok(Some(value.clone()));
        }

        match self.get_plugin_data(root.to_string()).await {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, root: &str, value: Value) -> Result<(), StorageError> {
        let mut staged = self.staged.write().await;
        staged.insert(root.to_string(), value);
        Ok(())
    }

    async fn remove(&self, root: &str) -> Result<(), StorageError> {
        let mut staged = self.staged.write().await;
        staged.remove(root);
        self.delete_plugin_data(root.to_string()).await?;
        tracing::info!("Removed plugin data '{root}'");
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        let mut staged = self.staged.write().await;
        if staged.is_empty() {
            return Ok(());
        }
        let data: HashMap<String, Value> = staged.clone();
        self.save_plugin_data(data).await?;
        staged.clear();
        tracing::debug!("Plugin data flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_put_is_staged_until_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plugin.db");
        let store = Store::open(&path).await.unwrap();

        store.put("root", json!({"initted": true})).await.unwrap();
        assert_eq!(
            store.get("root").await.unwrap(),
            Some(json!({"initted": true}))
        );
        assert!(matches!(
            store.get_plugin_data(String::from("root")).await,
            Err(Error::NotFound(_))
        ));

        store.flush().await.unwrap();
        assert_eq!(
            store.get_plugin_data(String::from("root")).await.unwrap(),
            json!({"initted": true})
        );
    }

    #[tokio::test]
    async fn test_reopen_and_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plugin.db");
        {
            let store = Store::open(&path).await.unwrap();
            store.put("a", json!([1, 2, 3])).await.unwrap();
            store.put("b", json!("x")).await.unwrap();
            store.flush().await.unwrap();
        }

        let store = Store::open(&path).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(json!("x")));
    }
}
