// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Donation engine
//!
//! Every mutation of the engine state (pending history, suspension counter,
//! last notification) and of the plugin data happens while holding the engine
//! lock, so the periodic task and the user actions never interleave.

use core::fmt;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use futures_util::future::{AbortHandle, Abortable};
use parking_lot::Mutex as ParkingLotMutex;
use sparechange_core::storage::StorageBackend;
use sparechange_core::{DonationWallet, HistoryEntry, OutPoint, RoundRobin};
use sparechange_sdk_sqlite::Store;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::{self, MissedTickBehavior};

mod check;
mod donate;
mod settings;

pub use self::check::{CheckOutcome, CoinList};
pub use self::settings::{CharityView, ThresholdCheck};
use crate::config::Config;
use crate::store::DataStore;
use crate::util::{dir, format};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The wallet coins changed
    CoinsUpdated,
    /// Eligible coins found while auto-donate is off
    CoinsAvailable { count: usize, total: u64 },
    AutoDonated { count: usize, total: u64 },
    AutoDonateDisabled,
    Error(String),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoinsUpdated => write!(f, "Coins updated"),
            Self::CoinsAvailable { count, total } => {
                write!(f, "{}", format::coins_available(*count, *total))
            }
            Self::AutoDonated { count, total } => {
                write!(f, "{}", format::auto_donated(*count, *total))
            }
            Self::AutoDonateDisabled => write!(f, "Auto-donate disabled"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

/// Wallet network events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    Updated,
    NewTransaction,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    /// Running, but auto-donate is held back by donations handed to the user
    Suspended,
}

#[derive(Debug, Default)]
struct EngineInner {
    /// Description -> entries waiting for the wallet label
    pending: HashMap<String, Vec<HistoryEntry>>,
    suspended: usize,
    last_notified: BTreeSet<OutPoint>,
    /// Coin set of the last reported auto-donate failure
    last_failed: BTreeSet<OutPoint>,
    foregrounded: bool,
}

/// Donation engine
pub struct Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    wallet: Arc<W>,
    store: DataStore<S>,
    config: Config,
    inner: Arc<Mutex<EngineInner>>,
    task: Arc<ParkingLotMutex<Option<AbortHandle>>>,
    wakeup: Arc<Notify>,
    notifications: Sender<Message>,
}

impl<W, S> Clone for Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    fn clone(&self) -> Self {
        Self {
            wallet: self.wallet.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            inner: self.inner.clone(),
            task: self.task.clone(),
            wakeup: self.wakeup.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<W, S> fmt::Debug for Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.wallet.kind())
            .field("running", &self.task.lock().is_some())
            .finish()
    }
}

impl<W> Engine<W, Store>
where
    W: DonationWallet,
{
    /// Open the engine of `wallet_name`, with the plugin data in SQLite
    pub async fn open<P, N>(base_path: P, wallet_name: N, wallet: W) -> Result<Self, Error>
    where
        P: AsRef<Path>,
        N: AsRef<str>,
    {
        let base_path = base_path.as_ref();
        let config = Config::try_from_file(base_path)?;
        let db_path = dir::wallet_db(base_path, wallet_name)?;
        let db = Store::open(db_path).await?;
        Ok(Self::new(wallet, DataStore::new(db), config))
    }
}

impl<W, S> Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    pub fn new(wallet: W, store: DataStore<S>, config: Config) -> Self {
        let (sender, _) = broadcast::channel::<Message>(1024);
        Self {
            wallet: Arc::new(wallet),
            store,
            config,
            inner: Arc::new(Mutex::new(EngineInner::default())),
            task: Arc::new(ParkingLotMutex::new(None)),
            wakeup: Arc::new(Notify::new()),
            notifications: sender,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn store(&self) -> &DataStore<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifications(&self) -> Receiver<Message> {
        self.notifications.subscribe()
    }

    async fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().await
    }

    fn send(&self, message: Message) {
        // Err only if there are no receivers
        let _ = self.notifications.send(message);
    }

    /// Log the error and forward it to the presentation layer
    fn report<E>(&self, e: E)
    where
        E: fmt::Display,
    {
        tracing::error!("{e}");
        self.send(Message::Error(e.to_string()));
    }

    pub fn is_compatible(&self) -> bool {
        self.wallet.kind().is_compatible()
    }

    fn check_compatible(&self) -> Result<(), Error> {
        let kind = self.wallet.kind();
        if kind.is_compatible() {
            Ok(())
        } else {
            Err(Error::IncompatibleWallet(kind))
        }
    }

    /// Re-derive the round-robin from the enabled charities with a valid address
    async fn refresh_scheduler(&self, save: bool) -> Result<RoundRobin, Error> {
        let recipients = self
            .store
            .valid_enabled_recipients(|address| self.wallet.is_valid_address(address))
            .await?;
        let mut rr: RoundRobin = self.store.roundrobin().await?;
        let before: RoundRobin = rr.clone();
        rr.update(recipients);
        if rr != before {
            tracing::debug!("Round-robin updated: {} recipients", rr.len());
            self.store.set_roundrobin(rr.clone(), save).await?;
        }
        Ok(rr)
    }

    /// Start the periodic check
    pub fn start(&self) -> Result<(), Error> {
        self.check_compatible()?;

        let mut task = self.task.lock();
        if task.is_some() {
            tracing::warn!("Donation engine already running");
            return Ok(());
        }

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let this = self.clone();
        let fut = async move {
            let mut interval = time::interval(this.config.check_interval().await);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match this.periodic_check().await {
                            Ok(outcome) => tracing::trace!("Periodic check: {outcome:?}"),
                            Err(e) => tracing::error!("Periodic check failed: {e}"),
                        }
                    }
                    _ = this.wakeup.notified() => {
                        this.send(Message::CoinsUpdated);
                    }
                }
            }
        };
        tokio::spawn(Abortable::new(fut, abort_registration));
        *task = Some(abort_handle);

        tracing::info!("Donation engine started");

        Ok(())
    }

    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::info!("Donation engine stopped");
        }
    }

    pub async fn state(&self) -> EngineState {
        if self.task.lock().is_none() {
            return EngineState::Stopped;
        }

        if self.lock().await.suspended > 0 {
            EngineState::Suspended
        } else {
            EngineState::Running
        }
    }

    /// Network callback: wake the engine task. Never blocks.
    pub fn handle_network_event(&self, event: NetworkEvent) {
        tracing::trace!("Network event: {event:?}");
        self.wakeup.notify_one();
    }

    /// The donation view is (or is no longer) in the foreground
    pub async fn set_view_foregrounded(&self, foregrounded: bool) {
        let mut inner = self.lock().await;
        inner.foregrounded = foregrounded;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use sparechange_core::{
        ChangeDef, Charity, Coin, DonationTransaction, MemoryStorage, Recipient, TxOutput,
        WalletError, WalletKind,
    };

    use super::*;
    use crate::config::Donation;

    #[derive(Debug, Clone)]
    pub struct MockTx {
        pub inputs: Vec<Coin>,
        pub outputs: Vec<TxOutput>,
        pub fee: u64,
        pub signed: bool,
    }

    impl DonationTransaction for MockTx {
        fn txid(&self) -> String {
            let ids: Vec<String> = self
                .inputs
                .iter()
                .map(|c| format!("{}{}", c.outpoint.txid, c.outpoint.vout))
                .collect();
            format!("tx{}", ids.join(""))
        }

        fn estimated_size(&self) -> usize {
            10 + 148 * self.inputs.len() + 34 * self.outputs.len()
        }
    }

    pub struct MockWallet {
        pub kind: WalletKind,
        pub utxos: ParkingLotMutex<Vec<Coin>>,
        pub height: u32,
        pub up_to_date: AtomicBool,
        pub password: AtomicBool,
        pub build_error: ParkingLotMutex<Option<WalletError>>,
    pub sign_error: ParkingLotMutex<Option<WalletError>>,
        pub fail_broadcast: AtomicBool,
        pub signed: AtomicUsize,
        pub broadcasted: ParkingLotMutex<Vec<String>>,
        pub labels: ParkingLotMutex<Vec<(String, String)>>,
        pub frozen: ParkingLotMutex<HashSet<String>>,
    }

    impl MockWallet {
        pub fn new(utxos: Vec<Coin>) -> Self {
            Self {
                kind: WalletKind::Standard,
                utxos: ParkingLotMutex::new(utxos),
                height: 100,
                up_to_date: AtomicBool::new(true),
                password: AtomicBool::new(false),
                build_error: ParkingLotMutex::new(None),
                sign_error: ParkingLotMutex::new(None),
                fail_broadcast: AtomicBool::new(false),
                signed: AtomicUsize::new(0),
                broadcasted: ParkingLotMutex::new(Vec::new()),
                labels: ParkingLotMutex::new(Vec::new()),
                frozen: ParkingLotMutex::new(HashSet::new()),
            }
        }
    }

    impl DonationWallet for MockWallet {
        type Transaction = MockTx;

        fn kind(&self) -> WalletKind {
            self.kind
        }

        fn is_up_to_date(&self) -> bool {
            self.up_to_date.load(Ordering::SeqCst)
        }

        fn get_utxos(&self) -> Result<Vec<Coin>, WalletError> {
            Ok(self.utxos.lock().clone())
        }

        fn local_height(&self) -> u32 {
            self.height
        }

        fn is_frozen(&self, address: &str) -> bool {
            self.frozen.lock().contains(address)
        }

        fn has_password(&self) -> bool {
            self.password.load(Ordering::SeqCst)
        }

        fn is_valid_address(&self, address: &str) -> bool {
            !address.is_empty()
                && !address.contains(char::is_whitespace)
                && !address.starts_with("invalid")
        }

        fn make_unsigned_transaction(
            &self,
            inputs: &[Coin],
            outputs: &[TxOutput],
            fixed_fee: u64,
        ) -> Result<MockTx, WalletError> {
            if let Some(e) = self.build_error.lock().clone() {
                return Err(e);
            }
            Ok(MockTx {
                inputs: inputs.to_vec(),
                outputs: outputs.to_vec(),
                fee: fixed_fee,
                signed: false,
            })
        }

        fn sign_transaction(
            &self,
            tx: &mut MockTx,
            _password: Option<&str>,
        ) -> Result<(), WalletError> {
            if let Some(e) = self.sign_error.lock().clone() {
                return Err(e);
            }
            tx.signed = true;
            self.signed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn broadcast(&self, tx: &MockTx) -> Result<String, WalletError> {
            if self.fail_broadcast.load(Ordering::SeqCst) {
                return Err(WalletError::Broadcast(String::from("rejected")));
            }
            let txid = tx.txid();
            self.broadcasted.lock().push(txid.clone());
            Ok(txid)
        }

        fn set_label(&self, txid: &str, label: &str) -> Result<(), WalletError> {
            self.labels
                .lock()
                .push((txid.to_string(), label.to_string()));
            Ok(())
        }
    }

    pub fn coin(vout: u32, value: u64) -> Coin {
        Coin::new(OutPoint::new("aa", vout), format!("mine{vout}"), value, Some(50))
    }

    pub fn recipient(name: &str, address: &str) -> Recipient {
        Recipient::new(name, address)
    }

    /// Engine with charities A (addr1) and B (addr2) enabled, round-robin
    /// `[A, B]`, threshold 5000 sats and no minimum age.
    pub async fn engine(wallet: MockWallet) -> Engine<MockWallet, MemoryStorage> {
        let store = DataStore::new(MemoryStorage::new());
        store
            .set_charities(
                vec![
                    Charity::new(true, "A", "addr1"),
                    Charity::new(true, "B", "addr2"),
                ],
                false,
            )
            .await
            .unwrap();
        store
            .set_roundrobin(
                vec![recipient("A", "addr1"), recipient("B", "addr2")]
                    .into_iter()
                    .collect(),
                false,
            )
            .await
            .unwrap();
        store
            .set_change_def(ChangeDef::new(5_000, 0), true)
            .await
            .unwrap();
        // Never saved: no file needed
        let config = Config {
            config_file_path: PathBuf::from("config.json"),
            donation: Donation::default(),
        };
        Engine::new(wallet, store, config)
    }

    pub fn drain(rx: &mut Receiver<Message>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_start_stop() {
        let engine = engine(MockWallet::new(Vec::new())).await;
        assert_eq!(engine.state().await, EngineState::Stopped);

        engine.start().unwrap();
        assert_eq!(engine.state().await, EngineState::Running);

        // Starting twice is a no-op
        engine.start().unwrap();

        engine.stop();
        assert_eq!(engine.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_network_event_wakes_engine() {
        let engine = engine(MockWallet::new(Vec::new())).await;
        let mut rx = engine.notifications();
        engine.start().unwrap();

        engine.handle_network_event(NetworkEvent::Updated);

        let message = time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Ok(Message::CoinsUpdated) => break true,
                    Ok(_) => continue,
                    Err(_) => break false,
                }
            }
        })
        .await
        .unwrap();
        assert!(message);

        engine.stop();
    }

    #[tokio::test]
    async fn test_incompatible_wallet() {
        for kind in [
            WalletKind::WatchingOnly,
            WalletKind::Multisig,
            WalletKind::Hardware,
            WalletKind::Slp,
        ] {
            let mut wallet = MockWallet::new(vec![coin(0, 1_000)]);
            wallet.kind = kind;
            let engine = engine(wallet).await;
            assert!(!engine.is_compatible());
            assert!(matches!(
                engine.start(),
                Err(Error::IncompatibleWallet(k)) if k == kind
            ));
            assert_eq!(engine.state().await, EngineState::Stopped);
        }

        assert_eq!(
            Error::IncompatibleWallet(WalletKind::Slp).to_string(),
            "SLP token wallets are not supported"
        );
    }

    #[test]
    fn test_message_display() {
        assert_eq!(
            Message::AutoDonated {
                count: 2,
                total: 2_626
            }
            .to_string(),
            "Auto-donated 2 coins, 2 626 sats"
        );
        assert_eq!(
            Message::Error(String::from("No charities are enabled!")).to_string(),
            "No charities are enabled!"
        );
    }
}
