// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

pub mod dir;
pub mod format;

/// Get the first 8 chars of a txid
pub fn cut_txid<S>(txid: S) -> String
where
    S: AsRef<str>,
{
    txid.as_ref().chars().take(8).collect()
}
