// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! SQLite storage for plugin data

mod error;
mod migration;
mod store;

pub use self::error::Error;
pub use self::store::Store;
