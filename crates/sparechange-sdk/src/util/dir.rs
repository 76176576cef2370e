// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

fn base_path<P>(base_path: P) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
{
    let path = base_path.as_ref().to_path_buf();
    std::fs::create_dir_all(path.as_path())?;
    Ok(path)
}

pub(crate) fn config_file_path<P>(base: P) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
{
    Ok(base_path(base)?.join("config.json"))
}

pub(crate) fn logs_path<P>(base: P) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
{
    let path = base_path(base)?.join("logs");
    std::fs::create_dir_all(path.as_path())?;
    Ok(path)
}

/// Plugin data db of a wallet
pub fn wallet_db<P, S>(base: P, wallet_name: S) -> Result<PathBuf, Error>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = base_path(base)?.join("wallets");
    std::fs::create_dir_all(path.as_path())?;
    Ok(path.join(format!("{}.db", wallet_name.as_ref())))
}
