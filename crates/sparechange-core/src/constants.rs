// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

/// Smallest value (sats) still worth donating: 546 dust limit + 224 spend cost
pub const DUST_FLOOR: u64 = 770;

/// Default change threshold (sats)
pub const DEFAULT_THRESHOLD: u64 = 10_500;
/// Default minimum age (confirmed blocks)
pub const DEFAULT_MIN_AGE: u32 = 72;

/// Thresholds at or above this value (sats) ask the user for confirmation
pub const WARN_HIGH_AMOUNT: u64 = 200_000;

/// Random bytes used for a donation reference
pub const REFERENCE_LEN: usize = 16;

/// URI scheme stripped from user supplied charity addresses
pub const ADDRESS_URI_SCHEME: &str = "bitcoincash";
