// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_AGE, DEFAULT_THRESHOLD};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid outpoint: {0}")]
    InvalidOutPoint(String),
    #[error("unknown age type: {0}")]
    UnknownAgeType(u8),
}

/// How [`ChangeDef::min_age`] is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AgeType {
    /// Confirmed blocks
    #[default]
    Blocks,
}

impl AgeType {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Blocks => 0,
        }
    }
}

impl TryFrom<u8> for AgeType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Blocks),
            v => Err(Error::UnknownAgeType(v)),
        }
    }
}

// Persisted as integer
impl Serialize for AgeType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_u8().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AgeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: u8 = u8::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Definition of "spare change"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeDef {
    /// Coins must be strictly below this value (sats)
    pub threshold: u64,
    /// Minimum confirmations. `0` disables the check.
    pub min_age: u32,
    pub age_type: AgeType,
}

impl Default for ChangeDef {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_age: DEFAULT_MIN_AGE,
            age_type: AgeType::default(),
        }
    }
}

impl ChangeDef {
    pub fn new(threshold: u64, min_age: u32) -> Self {
        Self {
            threshold,
            min_age,
            age_type: AgeType::Blocks,
        }
    }
}

/// Reference to a transaction output
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: String,
    pub vout: u32,
}

impl OutPoint {
    pub fn new<S>(txid: S, vout: u32) -> Self
    where
        S: Into<String>,
    {
        Self {
            txid: txid.into(),
            vout,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for OutPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidOutPoint(s.to_string()))?;
        if txid.is_empty() {
            return Err(Error::InvalidOutPoint(s.to_string()));
        }
        let vout: u32 = vout
            .parse()
            .map_err(|_| Error::InvalidOutPoint(s.to_string()))?;
        Ok(Self::new(txid, vout))
    }
}

/// Unspent output, as reported by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub address: String,
    /// Value (sats)
    pub value: u64,
    /// Confirmation height, `None` (or `0`) if unconfirmed
    pub height: Option<u32>,
    pub is_frozen: bool,
}

impl Coin {
    pub fn new<A>(outpoint: OutPoint, address: A, value: u64, height: Option<u32>) -> Self
    where
        A: Into<String>,
    {
        Self {
            outpoint,
            address: address.into(),
            value,
            height,
            is_frozen: false,
        }
    }

    pub fn frozen(mut self, is_frozen: bool) -> Self {
        self.is_frozen = is_frozen;
        self
    }
}

/// Committed donation record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub address: String,
    pub name: String,
    /// Value received by the recipient, fee excluded (sats)
    pub amount: u64,
    /// Correlation id shared by every entry of the same donation
    #[serde(rename = "ref")]
    pub reference: String,
    /// `<txid>:<index>`, or only `<index>` while not yet broadcast
    pub txout: String,
}

impl HistoryEntry {
    /// Check if the entry already carries a txid
    pub fn has_txid(&self) -> bool {
        self.txout.contains(':')
    }

    /// Prefix the txid to an index-only txout
    pub fn with_txid(mut self, txid: &str) -> Self {
        if !self.has_txid() {
            self.txout = format!("{txid}:{}", self.txout);
        }
        self
    }
}
