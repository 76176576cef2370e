// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Wallet collaborator
//!
//! Key management, signing, broadcasting and address validation are owned by
//! the host wallet. The donation engine only talks to it through
//! [`DonationWallet`].

use core::fmt;

use crate::Coin;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("excessive fee")]
    ExcessiveFee,
    #[error("invalid password")]
    InvalidPassword,
    #[error("broadcast failed: {0}")]
    Broadcast(String),
    #[error("{0}")]
    Generic(String),
}

/// Kind of wallet, used to check compatibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WalletKind {
    #[default]
    Standard,
    ImportedKeys,
    WatchingOnly,
    Multisig,
    Hardware,
    /// SLP token wallet: spending change would burn tokens
    Slp,
}

impl WalletKind {
    /// Only wallets able to sign on their own, without a co-signer or a
    /// device, can donate.
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Standard | Self::ImportedKeys)
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::ImportedKeys => write!(f, "imported keys"),
            Self::WatchingOnly => write!(f, "watching-only"),
            Self::Multisig => write!(f, "multisig"),
            Self::Hardware => write!(f, "hardware"),
            Self::Slp => write!(f, "SLP token"),
        }
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxOutput {
    pub address: String,
    /// Value (sats)
    pub value: u64,
}

impl TxOutput {
    pub fn new<S>(address: S, value: u64) -> Self
    where
        S: Into<String>,
    {
        Self {
            address: address.into(),
            value,
        }
    }
}

/// Transaction produced by the host wallet
pub trait DonationTransaction: fmt::Debug + Clone + Send + Sync + 'static {
    fn txid(&self) -> String;

    /// Estimated serialized size (bytes)
    fn estimated_size(&self) -> usize;
}

/// Host wallet
pub trait DonationWallet: Send + Sync + 'static {
    type Transaction: DonationTransaction;

    fn kind(&self) -> WalletKind {
        WalletKind::Standard
    }

    /// Network connected and both wallet and chain synced
    fn is_up_to_date(&self) -> bool;

    fn get_utxos(&self) -> Result<Vec<Coin>, WalletError>;

    fn local_height(&self) -> u32;

    fn is_frozen(&self, address: &str) -> bool;

    fn has_password(&self) -> bool;

    fn is_valid_address(&self, address: &str) -> bool;

    /// Build an unsigned transaction spending exactly `inputs` to `outputs`,
    /// paying `fixed_fee` sats.
    fn make_unsigned_transaction(
        &self,
        inputs: &[Coin],
        outputs: &[TxOutput],
        fixed_fee: u64,
    ) -> Result<Self::Transaction, WalletError>;

    fn sign_transaction(
        &self,
        tx: &mut Self::Transaction,
        password: Option<&str>,
    ) -> Result<(), WalletError>;

    /// Broadcast and return the txid reported by the network
    fn broadcast(&self, tx: &Self::Transaction) -> Result<String, WalletError>;

    fn set_label(&self, txid: &str, label: &str) -> Result<(), WalletError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_kind_compatibility() {
        assert!(WalletKind::Standard.is_compatible());
        assert!(WalletKind::ImportedKeys.is_compatible());
        assert!(!WalletKind::WatchingOnly.is_compatible());
        assert!(!WalletKind::Multisig.is_compatible());
        assert!(!WalletKind::Hardware.is_compatible());
        assert!(!WalletKind::Slp.is_compatible());
        assert_eq!(WalletKind::Slp.to_string(), "SLP token");
    }
}
