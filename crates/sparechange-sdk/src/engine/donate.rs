// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::collections::BTreeSet;

use sparechange_core::builder::{self, BuildError, Donation};
use sparechange_core::storage::StorageBackend;
use sparechange_core::{
    eligibility, Coin, DonationTransaction, DonationWallet, HistoryEntry, OutPoint, RoundRobin,
    WalletError,
};

use super::{CheckOutcome, Engine, EngineInner, Message};
use crate::util;
use crate::Error;

const PASSWORD_SET_MSG: &str = "Wallet now has a password. Auto-donate was turned off.";

/// Built donation and the number of coins it spends
type Built<T> = (usize, Donation<T>);

impl<W, S> Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    /// Split coins in one batch (single tx) or one batch per coin
    async fn batches(&self, coins: Vec<Coin>) -> Result<Vec<Vec<Coin>>, Error> {
        if self.store.singletx().await? {
            Ok(vec![coins])
        } else {
            Ok(coins.into_iter().map(|c| vec![c]).collect())
        }
    }

    fn build_all(
        &self,
        batches: &[Vec<Coin>],
        rr: &mut RoundRobin,
        label: &str,
    ) -> Result<Vec<Built<W::Transaction>>, BuildError> {
        let mut donations = Vec::with_capacity(batches.len());
        for batch in batches.iter() {
            let donation = builder::build(self.wallet.as_ref(), batch, rr, label)?;
            donations.push((batch.len(), donation));
        }
        Ok(donations)
    }

    /// Build a donation for every batch.
    ///
    /// The round-robin is persisted even if a build fails.
    async fn build_donations(
        &self,
        coins: Vec<Coin>,
        mut rr: RoundRobin,
    ) -> Result<Vec<Built<W::Transaction>>, Error> {
        let label: String = self.config.label().await;
        let batches: Vec<Vec<Coin>> = self.batches(coins).await?;
        let res = self.build_all(&batches, &mut rr, &label);
        self.store.set_roundrobin(rr, true).await?;
        Ok(res?)
    }

    /// Report an auto-donate failure, unless already reported for the same coins
    fn report_once(&self, inner: &mut EngineInner, coinset: BTreeSet<OutPoint>, e: &Error) {
        if inner.last_failed == coinset {
            tracing::debug!("Auto-donate still failing: {e}");
        } else {
            self.report(e);
            inner.last_failed = coinset;
        }
    }

    pub(super) async fn disable_autodonate(
        &self,
        inner: &mut EngineInner,
        password_set: bool,
    ) -> Result<(), Error> {
        self.store.set_autodonate(false, true).await?;
        inner.suspended = 0;
        self.send(Message::AutoDonateDisabled);
        if password_set {
            self.report(PASSWORD_SET_MSG);
        } else {
            tracing::info!("Auto-donate disabled");
        }
        Ok(())
    }

    /// Sign and broadcast without asking the user
    #[tracing::instrument(skip_all, level = "trace")]
    pub(super) async fn auto_donate(
        &self,
        inner: &mut EngineInner,
        coins: Vec<Coin>,
    ) -> Result<CheckOutcome, Error> {
        tracing::info!("Auto-donating {} coins", coins.len());

        let coinset: BTreeSet<OutPoint> = coins.iter().map(|c| c.outpoint.clone()).collect();
        let rr: RoundRobin = self.store.roundrobin().await?;
        let mut donations = match self.build_donations(coins, rr).await {
            Ok(donations) => donations,
            Err(e) => {
                self.report_once(inner, coinset, &e);
                return Err(e);
            }
        };

        // Sign everything before broadcasting anything
        for (_, donation) in donations.iter_mut() {
            match self.wallet.sign_transaction(&mut donation.tx, None) {
                Ok(()) => (),
                Err(WalletError::InvalidPassword) => {
                    self.disable_autodonate(inner, true).await?;
                    return Ok(CheckOutcome::PasswordProtected);
                }
                Err(e) => {
                    let e: Error = e.into();
                    self.report_once(inner, coinset, &e);
                    return Err(e);
                }
            }
        }
        inner.last_failed.clear();

        let mut count: usize = 0;
        let mut total: u64 = 0;
        for (coins, donation) in donations.into_iter() {
            let txid: String = match self.wallet.broadcast(&donation.tx) {
                Ok(txid) => txid,
                Err(e) => {
                    tracing::warn!("Impossible to broadcast '{}': {e}", donation.description);
                    continue;
                }
            };

            if txid != donation.tx.txid() {
                tracing::warn!("Broadcast txid {txid} != {}", donation.tx.txid());
            }

            if let Err(e) = self.wallet.set_label(&txid, &donation.description) {
                tracing::warn!("Impossible to label {}: {e}", util::cut_txid(&txid));
            }

            self.store
                .history_put_entries(donation.history_entries(Some(&txid)), false)
                .await?;
            count += coins;
            total += donation.total();

            tracing::info!(
                "Donation {} broadcasted: {}",
                util::cut_txid(&txid),
                donation.description
            );
        }

        if count > 0 {
            self.store.save().await?;
            self.send(Message::AutoDonated { count, total });
        }

        Ok(CheckOutcome::AutoDonated { count, total })
    }

    async fn internal_manual_donate(
        &self,
        inner: &mut EngineInner,
        coins: Vec<Coin>,
    ) -> Result<Vec<Donation<W::Transaction>>, Error> {
        let rr: RoundRobin = self.refresh_scheduler(false).await?;
        if rr.is_empty() {
            let e = Error::NoCharitiesEnabled;
            self.report(&e);
            return Err(e);
        }

        if coins.is_empty() {
            return Err(Error::NoEligibleCoins);
        }

        let built = match self.build_donations(coins, rr).await {
            Ok(built) => built,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };

        let autodonate: bool = self.store.autodonate().await?;
        let mut donations: Vec<Donation<W::Transaction>> = Vec::with_capacity(built.len());
        for (_, donation) in built.into_iter() {
            inner
                .pending
                .entry(donation.description.clone())
                .or_default()
                .extend(donation.history_entries(None));

            // Hold auto-donate back while the user is looking at it
            if autodonate {
                inner.suspended += 1;
            }

            donations.push(donation);
        }

        tracing::info!("{} donation(s) handed to the user", donations.len());

        Ok(donations)
    }

    /// Build unsigned donations for `coins`.
    ///
    /// The donations are committed to the history only when the wallet
    /// labels the transaction with the donation description (see
    /// [`Engine::on_set_label`]).
    pub async fn manual_donate(
        &self,
        coins: Vec<Coin>,
    ) -> Result<Vec<Donation<W::Transaction>>, Error> {
        self.check_compatible()?;
        let mut inner = self.lock().await;
        self.internal_manual_donate(&mut inner, coins).await
    }

    /// Donate every eligible coin
    pub async fn donate_all(&self) -> Result<Vec<Donation<W::Transaction>>, Error> {
        self.check_compatible()?;
        let mut inner = self.lock().await;
        let coins: Vec<Coin> = eligibility::eligible_coins(&self.classify().await?);
        self.internal_manual_donate(&mut inner, coins).await
    }

    /// Donate the eligible coins among `selection`
    pub async fn donate_selected(
        &self,
        selection: &[OutPoint],
    ) -> Result<Vec<Donation<W::Transaction>>, Error> {
        self.check_compatible()?;
        let mut inner = self.lock().await;
        let coins: Vec<Coin> = eligibility::eligible_coins(&self.classify().await?)
            .into_iter()
            .filter(|c| selection.contains(&c.outpoint))
            .collect();
        self.internal_manual_donate(&mut inner, coins).await
    }

    /// The wallet labeled `txid` with `text`: commit the matching pending
    /// donation, if any. Return the number of committed entries.
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn on_set_label<T, L>(&self, txid: T, text: L) -> Result<usize, Error>
    where
        T: AsRef<str>,
        L: AsRef<str>,
    {
        let mut inner = self.lock().await;
        let entries: Vec<HistoryEntry> = match inner.pending.remove(text.as_ref()) {
            Some(entries) => entries,
            None => return Ok(0),
        };

        let txid: &str = txid.as_ref();
        let entries = entries.into_iter().map(|e| e.with_txid(txid));
        let committed: usize = self.store.history_put_entries(entries, false).await?;
        self.store.save().await?;

        tracing::info!(
            "Committed {committed} history entries for {}",
            util::cut_txid(txid)
        );

        Ok(committed)
    }

    /// The donation with `description`, handed to the user, was closed.
    ///
    /// Entries not committed yet by [`Engine::on_set_label`] are discarded.
    /// Return the number of discarded entries.
    pub async fn dialog_closed<D>(&self, description: D) -> usize
    where
        D: AsRef<str>,
    {
        let mut inner = self.lock().await;
        inner.suspended = inner.suspended.saturating_sub(1);
        tracing::debug!("Auto-donate suspension: {}", inner.suspended);

        match inner.pending.remove(description.as_ref()) {
            Some(entries) => {
                tracing::info!("Donation abandoned: {} entries discarded", entries.len());
                entries.len()
            }
            None => 0,
        }
    }

    /// Number of donations (handed to the user) holding auto-donate back
    pub async fn suspension(&self) -> usize {
        self.lock().await.suspended
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use sparechange_core::{Allocation, Charity};

    use super::*;
    use crate::engine::tests::{coin, drain, engine, recipient, MockWallet};
    use crate::engine::EngineState;

    #[tokio::test]
    async fn test_manual_batched_donation() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.store().set_singletx(true, false).await.unwrap();

        let donations = engine.donate_all().await.unwrap();
        assert_eq!(donations.len(), 1);

        let donation = &donations[0];
        // 10 + 2*148 + 2*34 = 374 -> 187 per output
        assert_eq!(donation.fee_per_output, 187);
        assert_eq!(
            donation.allocations,
            vec![
                Allocation {
                    recipient: recipient("A", "addr1"),
                    amount: 1_000 - 187
                },
                Allocation {
                    recipient: recipient("B", "addr2"),
                    amount: 2_000 - 187
                },
            ]
        );
        assert!(!donation.tx.signed);

        // Each got exactly one coin
        let rr = engine.store().roundrobin().await.unwrap();
        assert_eq!(
            rr.as_slice(),
            &[recipient("A", "addr1"), recipient("B", "addr2")]
        );

        // Nothing committed yet
        assert!(engine.store().history().await.unwrap().is_empty());
        assert_eq!(engine.wallet().signed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_manual_one_tx_per_coin() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;

        let donations = engine.donate_all().await.unwrap();
        assert_eq!(donations.len(), 2);
        assert_eq!(donations[0].allocations[0].recipient.name, "A");
        assert_eq!(donations[1].allocations[0].recipient.name, "B");
        assert_ne!(donations[0].reference, donations[1].reference);
    }

    #[tokio::test]
    async fn test_donate_selected() {
        let engine = engine(MockWallet::new(vec![
            coin(0, 1_000),
            coin(1, 2_000),
            coin(2, 700),
        ]))
        .await;

        let donations = engine
            .donate_selected(&[OutPoint::new("aa", 1), OutPoint::new("aa", 2)])
            .await
            .unwrap();
        // Coin 2 is dust
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].tx.inputs, vec![coin(1, 2_000)]);

        assert!(matches!(
            engine.donate_selected(&[OutPoint::new("aa", 2)]).await,
            Err(Error::NoEligibleCoins)
        ));
    }

    #[tokio::test]
    async fn test_manual_donate_without_charities() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000)])).await;
        engine
            .store()
            .set_charities(vec![Charity::new(false, "A", "addr1")], false)
            .await
            .unwrap();
        let mut rx = engine.notifications();

        assert!(matches!(
            engine.donate_all().await,
            Err(Error::NoCharitiesEnabled)
        ));
        assert_eq!(
            drain(&mut rx),
            vec![Message::Error(String::from("No charities are enabled!"))]
        );
    }

    #[tokio::test]
    async fn test_failed_build_still_rotates() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000)])).await;
        let mut rx = engine.notifications();

        // Too small to pay its fee: 10 + 148 + 34 = 192
        let err = engine.manual_donate(vec![coin(5, 150)]).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::InsufficientFunds)));
        assert_eq!(
            drain(&mut rx),
            vec![Message::Error(String::from("insufficient funds"))]
        );

        let rr = engine.store().roundrobin().await.unwrap();
        assert_eq!(
            rr.as_slice(),
            &[recipient("B", "addr2"), recipient("A", "addr1")]
        );
    }

    #[tokio::test]
    async fn test_on_set_label_commits_pending() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.store().set_singletx(true, false).await.unwrap();

        let donations = engine.donate_all().await.unwrap();
        let description = donations[0].description.clone();

        // Unrelated label
        assert_eq!(engine.on_set_label("ff", "other").await.unwrap(), 0);

        assert_eq!(engine.on_set_label("ff", &description).await.unwrap(), 2);
        let a = engine.store().history_for_address("addr1").await.unwrap();
        let b = engine.store().history_for_address("addr2").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].txout, "ff:0");
        assert_eq!(b[0].txout, "ff:1");
        assert_eq!(a[0].reference, b[0].reference);
        assert_eq!(
            engine.store().history_total_for_address("addr2").await.unwrap(),
            2_000 - 187
        );

        // Pending entries are gone
        assert_eq!(engine.on_set_label("ff", &description).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auto_donate_history() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.store().set_singletx(true, false).await.unwrap();
        engine.set_autodonate(true).await.unwrap();
        let mut rx = engine.notifications();

        // Failed attempt: nothing committed
        engine.wallet().fail_broadcast.store(true, Ordering::SeqCst);
        assert_eq!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::AutoDonated { count: 0, total: 0 }
        );
        assert!(engine.store().history().await.unwrap().is_empty());
        assert!(drain(&mut rx).is_empty());

        engine.wallet().fail_broadcast.store(false, Ordering::SeqCst);
        let outcome = engine.periodic_check().await.unwrap();
        assert_eq!(
            outcome,
            CheckOutcome::AutoDonated {
                count: 2,
                total: 3_000 - 374
            }
        );

        let history = engine.store().history().await.unwrap();
        let entries: Vec<&HistoryEntry> = history.values().flatten().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.txout.is_empty() && e.has_txid()));

        let txid = engine.wallet().broadcasted.lock()[0].clone();
        assert_eq!(engine.wallet().labels.lock()[0].0, txid);
        assert!(engine.wallet().labels.lock()[0].1.starts_with("Donate Change: A, B"));
        assert_eq!(
            drain(&mut rx),
            vec![Message::AutoDonated {
                count: 2,
                total: 2_626
            }]
        );
    }

    #[tokio::test]
    async fn test_auto_donate_one_tx_per_coin() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();

        assert!(matches!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::AutoDonated { count: 2, .. }
        ));
        assert_eq!(engine.wallet().signed.load(Ordering::SeqCst), 2);
        assert_eq!(engine.wallet().broadcasted.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_donate_with_password() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();
        engine.wallet().password.store(true, Ordering::SeqCst);
        let mut rx = engine.notifications();

        assert_eq!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::PasswordProtected
        );
        assert_eq!(engine.wallet().signed.load(Ordering::SeqCst), 0);
        assert!(engine.wallet().broadcasted.lock().is_empty());
        assert!(!engine.store().autodonate().await.unwrap());
        assert_eq!(
            drain(&mut rx),
            vec![
                Message::AutoDonateDisabled,
                Message::Error(String::from(PASSWORD_SET_MSG))
            ]
        );
        assert_eq!(engine.wallet().utxos.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_donate_invalid_password_while_signing() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();
        *engine.wallet().sign_error.lock() = Some(WalletError::InvalidPassword);

        assert_eq!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::PasswordProtected
        );
        assert!(engine.wallet().broadcasted.lock().is_empty());
        assert!(!engine.store().autodonate().await.unwrap());
        assert!(engine.store().history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_donation_suspends_auto_donate() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();

        let donations = engine.donate_all().await.unwrap();
        engine.start().unwrap();
        assert_eq!(engine.suspension().await, 2);
        assert_eq!(engine.state().await, EngineState::Suspended);
        assert_eq!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::Suspended
        );

        for donation in donations.iter() {
            engine.dialog_closed(&donation.description).await;
        }
        // Never below zero
        assert_eq!(engine.dialog_closed("unknown").await, 0);
        assert_eq!(engine.suspension().await, 0);
        assert_eq!(engine.state().await, EngineState::Running);

        engine.stop();
    }

    #[tokio::test]
    async fn test_autodonate_change_resets_suspension() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000)])).await;
        engine.set_autodonate(true).await.unwrap();
        engine.donate_all().await.unwrap();
        assert_eq!(engine.suspension().await, 1);

        engine.set_autodonate(false).await.unwrap();
        assert_eq!(engine.suspension().await, 0);

        // Auto-donate off: manual donations don't suspend
        engine.donate_all().await.unwrap();
        assert_eq!(engine.suspension().await, 0);
    }

    #[tokio::test]
    async fn test_abandoned_donations_are_discarded() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();

        for _ in 0..5 {
            let donations = engine.donate_all().await.unwrap();
            assert_eq!(donations.len(), 2);
            for donation in donations.iter() {
                assert_eq!(engine.dialog_closed(&donation.description).await, 1);
            }
        }

        assert_eq!(engine.suspension().await, 0);
        assert!(engine.lock().await.pending.is_empty());
        assert!(engine.store().history().await.unwrap().is_empty());

        // Labeled before closing: committed, nothing left to discard
        let donations = engine.donate_all().await.unwrap();
        let description = donations[0].description.clone();
        assert_eq!(engine.on_set_label("ff", &description).await.unwrap(), 1);
        assert_eq!(engine.dialog_closed(&description).await, 0);
        assert_eq!(engine.dialog_closed(&donations[1].description).await, 1);
        assert!(engine.lock().await.pending.is_empty());
        // 10 + 148 + 34 = 192
        assert_eq!(
            engine.store().history_total_for_address("addr1").await.unwrap(),
            1_000 - 192
        );
    }

    #[tokio::test]
    async fn test_auto_donate_failure_reported_once_per_coin_set() {
        let engine = engine(MockWallet::new(vec![coin(0, 1_000), coin(1, 2_000)])).await;
        engine.set_autodonate(true).await.unwrap();
        *engine.wallet().build_error.lock() = Some(WalletError::ExcessiveFee);
        let mut rx = engine.notifications();

        for _ in 0..3 {
            assert!(matches!(
                engine.periodic_check().await,
                Err(Error::Build(BuildError::ExcessiveFee))
            ));
        }
        assert_eq!(
            drain(&mut rx),
            vec![Message::Error(String::from("excessive fee"))]
        );

        // New coin, new coin set
        engine.wallet().utxos.lock().push(coin(2, 4_000));
        assert!(engine.periodic_check().await.is_err());
        assert_eq!(
            drain(&mut rx),
            vec![Message::Error(String::from("excessive fee"))]
        );

        *engine.wallet().build_error.lock() = None;
        assert!(matches!(
            engine.periodic_check().await.unwrap(),
            CheckOutcome::AutoDonated { count: 3, .. }
        ));
    }
}
