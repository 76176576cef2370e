// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use deadpool_sqlite::{CreatePoolError, InteractError, PoolError};

/// Store error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sqlite error
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Pool error
    #[error(transparent)]
    CreateDeadPool(#[from] CreatePoolError),
    /// Pool error
    #[error(transparent)]
    DeadPool(#[from] PoolError),
    /// Pool error
    #[error(transparent)]
    DeadPoolInteract(#[from] InteractError),
    /// JSON error
    #[error(transparent)]
    JSON(#[from] serde_json::Error),
    /// Not found
    #[error("sqlite: {0} not found")]
    NotFound(String),
}

impl From<Error> for sparechange_core::storage::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::JSON(e) => Self::Json(e),
            e => Self::Backend(e.to_string()),
        }
    }
}
