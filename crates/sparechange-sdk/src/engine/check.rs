// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::collections::BTreeSet;

use sparechange_core::eligibility::{self, AnnotatedCoin};
use sparechange_core::storage::StorageBackend;
use sparechange_core::{ChangeDef, Coin, DonationWallet, OutPoint};

use super::{Engine, EngineInner, Message};
use crate::util::format;
use crate::Error;

/// Result of a periodic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Incompatible,
    /// Network or wallet not synced yet: retry at next interval
    NotSynced,
    NoEligibleCoins,
    NoRecipients,
    /// The wallet has a password: auto-donate was turned off
    PasswordProtected,
    /// Donations handed to the user are still open
    Suspended,
    ViewForegrounded,
    /// Same coin set already notified
    AlreadyNotified,
    Notified { count: usize, total: u64 },
    AutoDonated { count: usize, total: u64 },
}

/// Annotated wallet coins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinList {
    pub coins: Vec<AnnotatedCoin>,
    pub eligible: usize,
}

impl CoinList {
    pub fn summary(&self) -> String {
        format::coins_summary(self.eligible, self.coins.len())
    }

    pub fn eligible_coins(&self) -> Vec<Coin> {
        eligibility::eligible_coins(&self.coins)
    }
}

impl<W, S> Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    pub(super) async fn classify(&self) -> Result<Vec<AnnotatedCoin>, Error> {
        let local_height: u32 = self.wallet.local_height();
        let coins: Vec<Coin> = self
            .wallet
            .get_utxos()?
            .into_iter()
            .map(|coin| {
                let frozen: bool = coin.is_frozen || self.wallet.is_frozen(&coin.address);
                coin.frozen(frozen)
            })
            .collect();
        let criteria: ChangeDef = self.store.change_def().await?;
        Ok(eligibility::classify(&coins, &criteria, local_height))
    }

    /// Wallet coins annotated with their eligibility
    pub async fn coins(&self) -> Result<CoinList, Error> {
        let _inner = self.lock().await;
        let coins: Vec<AnnotatedCoin> = self.classify().await?;
        let eligible: usize = eligibility::count_eligible(&coins);
        Ok(CoinList { coins, eligible })
    }

    /// Look for eligible coins and either donate them (auto-donate) or tell
    /// the user about them.
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn periodic_check(&self) -> Result<CheckOutcome, Error> {
        if !self.is_compatible() {
            return Ok(CheckOutcome::Incompatible);
        }

        if !self.wallet.is_up_to_date() {
            tracing::debug!("Wallet not up to date, will try again later");
            return Ok(CheckOutcome::NotSynced);
        }

        let mut inner = self.lock().await;

        let coins: Vec<Coin> = eligibility::eligible_coins(&self.classify().await?);
        if coins.is_empty() {
            return Ok(CheckOutcome::NoEligibleCoins);
        }

        if self.refresh_scheduler(false).await?.is_empty() {
            return Ok(CheckOutcome::NoRecipients);
        }

        if self.store.autodonate().await? {
            // Password may have been set in the meantime
            if self.wallet.has_password() {
                self.disable_autodonate(&mut inner, true).await?;
                return Ok(CheckOutcome::PasswordProtected);
            }

            if inner.suspended > 0 {
                tracing::info!(
                    "Auto-donate suspended: {} donation(s) still open",
                    inner.suspended
                );
                return Ok(CheckOutcome::Suspended);
            }

            return self.auto_donate(&mut inner, coins).await;
        }

        Ok(self.notify_user(&mut inner, &coins))
    }

    fn notify_user(&self, inner: &mut EngineInner, coins: &[Coin]) -> CheckOutcome {
        if inner.foregrounded {
            return CheckOutcome::ViewForegrounded;
        }

        let coinset: BTreeSet<OutPoint> = coins.iter().map(|c| c.outpoint.clone()).collect();
        if coinset == inner.last_notified {
            return CheckOutcome::AlreadyNotified;
        }

        let count: usize = coins.len();
        let total: u64 = coins.iter().map(|c| c.value).sum();
        self.send(Message::CoinsAvailable { count, total });
        inner.last_notified = coinset;

        CheckOutcome::Notified { count, total }
    }
}
