// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use sparechange_core::{BuildError, WalletError, WalletKind};
use thiserror::Error;

use crate::util;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Dir(#[from] util::dir::Error),
    #[error(transparent)]
    JSON(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] crate::config::Error),
    #[error(transparent)]
    Logger(#[from] crate::logger::Error),
    #[error(transparent)]
    DataStore(#[from] crate::store::Error),
    #[error(transparent)]
    Store(#[from] sparechange_sdk_sqlite::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("No charities are enabled!")]
    NoCharitiesEnabled,
    #[error("no eligible coins")]
    NoEligibleCoins,
    #[error("wallet is password protected: auto-donate not allowed")]
    PasswordProtected,
    #[error("{0} wallets are not supported")]
    IncompatibleWallet(WalletKind),
    #[error("charity #{0} not found")]
    CharityNotFound(usize),
}
