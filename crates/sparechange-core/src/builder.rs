// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Donation transaction builder

use crate::util;
use crate::wallet::{DonationTransaction, DonationWallet, TxOutput, WalletError};
use crate::{Coin, HistoryEntry, Recipient, RoundRobin};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Wallet(WalletError),
    #[error("no coins to donate")]
    NoCoins,
    #[error("no recipients enabled")]
    NoRecipients,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("excessive fee")]
    ExcessiveFee,
}

impl From<WalletError> for BuildError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::InsufficientFunds => Self::InsufficientFunds,
            WalletError::ExcessiveFee => Self::ExcessiveFee,
            e => Self::Wallet(e),
        }
    }
}

/// Amount assigned to a recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub recipient: Recipient,
    /// Value (sats)
    pub amount: u64,
}

/// Unsigned donation
#[derive(Debug, Clone)]
pub struct Donation<T> {
    pub tx: T,
    /// Human readable description, also used as wallet label
    pub description: String,
    pub reference: String,
    /// Final (fee deducted) allocations, in output order
    pub allocations: Vec<Allocation>,
    /// Fee paid by each output (sats)
    pub fee_per_output: u64,
}

impl<T> Donation<T> {
    /// Sum of the final outputs (sats)
    pub fn total(&self) -> u64 {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    pub fn total_fee(&self) -> u64 {
        self.fee_per_output * self.allocations.len() as u64
    }

    /// History entries of this donation.
    ///
    /// Without a txid the txout is only the output index.
    pub fn history_entries(&self, txid: Option<&str>) -> Vec<HistoryEntry> {
        self.allocations
            .iter()
            .enumerate()
            .map(|(index, allocation)| HistoryEntry {
                address: allocation.recipient.address.clone(),
                name: allocation.recipient.name.clone(),
                amount: allocation.amount,
                reference: self.reference.clone(),
                txout: match txid {
                    Some(txid) => format!("{txid}:{index}"),
                    None => index.to_string(),
                },
            })
            .collect()
    }
}

/// Assign every coin to the next recipient of the rotation.
///
/// A coin is never split: one recipient per coin. Allocations keep the order
/// in which recipients were first picked.
pub fn allocate(coins: &[Coin], scheduler: &mut RoundRobin) -> Result<Vec<Allocation>, BuildError> {
    let mut allocations: Vec<Allocation> = Vec::new();
    for coin in coins.iter() {
        let recipient: Recipient = scheduler.rotate().ok_or(BuildError::NoRecipients)?;
        match allocations.iter_mut().find(|a| a.recipient == recipient) {
            Some(allocation) => allocation.amount += coin.value,
            None => allocations.push(Allocation {
                recipient,
                amount: coin.value,
            }),
        }
    }
    Ok(allocations)
}

fn outputs(allocations: &[Allocation]) -> Vec<TxOutput> {
    allocations
        .iter()
        .map(|a| TxOutput::new(a.recipient.address.clone(), a.amount))
        .collect()
}

/// Build an unsigned donation spending all `coins`.
///
/// The fee is measured on a zero-fee draft and split evenly (rounded up)
/// between the outputs.
///
/// The scheduler is rotated once per coin and rotations are NOT rolled back
/// on failure: the caller is expected to persist the scheduler anyway.
#[tracing::instrument(skip_all, level = "trace")]
pub fn build<W>(
    wallet: &W,
    coins: &[Coin],
    scheduler: &mut RoundRobin,
    label: &str,
) -> Result<Donation<W::Transaction>, BuildError>
where
    W: DonationWallet,
{
    if coins.is_empty() {
        return Err(BuildError::NoCoins);
    }

    if scheduler.is_empty() {
        return Err(BuildError::NoRecipients);
    }

    let reference: String = util::new_reference();
    let allocations: Vec<Allocation> = allocate(coins, scheduler)?;

    let names: Vec<&str> = allocations
        .iter()
        .map(|a| a.recipient.name.as_str())
        .collect();
    let description: String = format!("{label}: {} (ref: {reference})", names.join(", "));

    // Zero-fee draft, only to measure the size
    let draft = wallet.make_unsigned_transaction(coins, &outputs(&allocations), 0)?;
    let size: u64 = draft.estimated_size() as u64;
    let count: u64 = allocations.len() as u64;
    let fee_per_output: u64 = (size + count - 1) / count;

    let mut adjusted: Vec<Allocation> = Vec::with_capacity(allocations.len());
    for allocation in allocations.into_iter() {
        if allocation.amount <= fee_per_output {
            tracing::warn!(
                "Output for {} can't pay its fee share ({} <= {fee_per_output})",
                allocation.recipient,
                allocation.amount
            );
            return Err(BuildError::InsufficientFunds);
        }
        adjusted.push(Allocation {
            recipient: allocation.recipient,
            amount: allocation.amount - fee_per_output,
        });
    }

    let tx = wallet.make_unsigned_transaction(coins, &outputs(&adjusted), fee_per_output * count)?;

    tracing::debug!(
        "Built donation {reference}: {} coins, {} outputs, fee {} sats",
        coins.len(),
        count,
        fee_per_output * count
    );

    Ok(Donation {
        tx,
        description,
        reference,
        allocations: adjusted,
        fee_per_output,
    })
}
