// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Spare change donation primitives

#![forbid(unsafe_code)]

pub mod builder;
pub mod constants;
pub mod eligibility;
pub mod recipient;
pub mod round_robin;
pub mod storage;
pub mod types;
pub mod util;
pub mod wallet;

pub use self::builder::{Allocation, BuildError, Donation};
pub use self::eligibility::{AnnotatedCoin, Ineligibility};
pub use self::recipient::{Charity, Recipient};
pub use self::round_robin::RoundRobin;
pub use self::storage::{MemoryStorage, StorageBackend};
pub use self::types::{AgeType, ChangeDef, Coin, HistoryEntry, OutPoint};
pub use self::wallet::{DonationTransaction, DonationWallet, TxOutput, WalletError, WalletKind};
