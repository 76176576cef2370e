// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Store

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use deadpool_sqlite::{Config, Object, Pool, Runtime};
use serde_json::Value;
use tokio::sync::RwLock;

mod plugin_data;

use super::migration;
use super::Error;

/// Store
#[derive(Clone)]
pub struct Store {
    pool: Pool,
    /// Values put but not flushed yet
    staged: Arc<RwLock<HashMap<String, Value>>>,
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store")
    }
}

impl Store {
    /// Open new database
    pub async fn open<P>(db_path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let cfg = Config::new(db_path.as_ref());
        let pool = cfg.create_pool(Runtime::Tokio1)?;
        let conn = pool.get().await?;
        migration::run(&conn).await?;
        Ok(Self {
            pool,
            staged: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    async fn acquire(&self) -> Result<Object, Error> {
        Ok(self.pool.get().await?)
    }
}
