// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

#![forbid(unsafe_code)]
#![warn(rustdoc::bare_urls)]

//! Spare change donation SDK

pub use {sparechange_core as core, sparechange_sdk_sqlite as sqlite};

pub mod config;
pub mod constants;
pub mod engine;
mod error;
pub mod logger;
pub mod prelude;
pub mod store;
pub mod util;

pub use self::engine::{
    CharityView, CheckOutcome, CoinList, Engine, EngineState, Message, NetworkEvent,
    ThresholdCheck,
};
pub use self::error::Error;
pub use self::store::DataStore;

pub fn git_hash_version() -> Option<String> {
    std::env::var("GIT_HASH").ok()
}
