// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Persistent plugin data
//!
//! Everything lives in a single JSON object stored under [`ROOT_KEY`]. The
//! object is loaded lazily, and filled with defaults the first time (gated by
//! the stored `initted` flag). Setters always stage the new object in the
//! backend: `save` controls if it's flushed right away.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sparechange_core::storage::{self, StorageBackend};
use sparechange_core::{ChangeDef, Charity, HistoryEntry, Recipient, RoundRobin};
use tokio::sync::Mutex;

use crate::constants::{DEFAULT_CHARITIES, ROOT_KEY};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] storage::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// History: address -> entries
pub type History = BTreeMap<String, Vec<HistoryEntry>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct PluginData {
    initted: bool,
    charities: Vec<Charity>,
    change_def: ChangeDef,
    autodonate: bool,
    singletx: bool,
    roundrobin: RoundRobin,
    history: History,
    warn_hi: bool,
}

impl Default for PluginData {
    fn default() -> Self {
        Self {
            initted: false,
            charities: DEFAULT_CHARITIES
                .iter()
                .map(|(enabled, name, address)| Charity::new(*enabled, *name, *address))
                .collect(),
            change_def: ChangeDef::default(),
            autodonate: false,
            singletx: false,
            roundrobin: RoundRobin::new(),
            history: History::new(),
            warn_hi: true,
        }
    }
}

/// Plugin data store
#[derive(Debug)]
pub struct DataStore<S>
where
    S: StorageBackend,
{
    backend: Arc<S>,
    data: Arc<Mutex<Option<PluginData>>>,
}

impl<S> Clone for DataStore<S>
where
    S: StorageBackend,
{
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            data: self.data.clone(),
        }
    }
}

impl<S> DataStore<S>
where
    S: StorageBackend,
{
    pub fn new(backend: S) -> Self {
        Self {
            backend: Arc::new(backend),
            data: Arc::new(Mutex::new(None)),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    async fn load(&self) -> Result<PluginData, Error> {
        let data: PluginData = match self.backend.get(ROOT_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => PluginData::default(),
        };

        if data.initted {
            return Ok(data);
        }

        tracing::info!("Plugin data not initialized: using defaults");

        Ok(PluginData {
            initted: true,
            ..Default::default()
        })
    }

    async fn read<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&PluginData) -> R,
    {
        let mut slot = self.data.lock().await;
        let data: PluginData = match slot.take() {
            Some(data) => data,
            None => self.load().await?,
        };
        Ok(f(slot.insert(data)))
    }

    async fn update<F, R>(&self, save: bool, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut PluginData) -> R,
    {
        let mut slot = self.data.lock().await;
        let data: PluginData = match slot.take() {
            Some(data) => data,
            None => self.load().await?,
        };
        let data: &mut PluginData = slot.insert(data);
        let res: R = f(data);

        let value: Value = serde_json::to_value(&*data)?;
        self.backend.put(ROOT_KEY, value).await?;
        if save {
            self.backend.flush().await?;
        }

        Ok(res)
    }

    /// Flush staged data
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn save(&self) -> Result<(), Error> {
        Ok(self.backend.flush().await?)
    }

    /// Remove every plugin data. The next access will use the defaults.
    pub async fn wipe(&self) -> Result<(), Error> {
        let mut slot = self.data.lock().await;
        self.backend.remove(ROOT_KEY).await?;
        *slot = None;
        tracing::warn!("Plugin data wiped");
        Ok(())
    }

    pub async fn charities(&self) -> Result<Vec<Charity>, Error> {
        self.read(|d| d.charities.clone()).await
    }

    /// Enabled charities with a valid address, as recipients
    pub async fn valid_enabled_recipients<F>(&self, is_valid: F) -> Result<Vec<Recipient>, Error>
    where
        F: Fn(&str) -> bool,
    {
        self.read(|d| {
            d.charities
                .iter()
                .filter(|c| c.enabled && is_valid(&c.address))
                .map(|c| c.recipient())
                .collect()
        })
        .await
    }

    pub async fn set_charities(&self, charities: Vec<Charity>, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.charities = charities).await
    }

    pub async fn change_def(&self) -> Result<ChangeDef, Error> {
        self.read(|d| d.change_def).await
    }

    pub async fn set_change_def(&self, change_def: ChangeDef, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.change_def = change_def).await
    }

    pub async fn autodonate(&self) -> Result<bool, Error> {
        self.read(|d| d.autodonate).await
    }

    pub async fn set_autodonate(&self, autodonate: bool, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.autodonate = autodonate).await
    }

    /// One single transaction for all coins
    pub async fn singletx(&self) -> Result<bool, Error> {
        self.read(|d| d.singletx).await
    }

    pub async fn set_singletx(&self, singletx: bool, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.singletx = singletx).await
    }

    pub async fn roundrobin(&self) -> Result<RoundRobin, Error> {
        self.read(|d| d.roundrobin.clone()).await
    }

    pub async fn set_roundrobin(&self, roundrobin: RoundRobin, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.roundrobin = roundrobin).await
    }

    /// Warn when the threshold is set too high
    pub async fn warn_hi(&self) -> Result<bool, Error> {
        self.read(|d| d.warn_hi).await
    }

    pub async fn set_warn_hi(&self, warn_hi: bool, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.warn_hi = warn_hi).await
    }

    pub async fn history(&self) -> Result<History, Error> {
        self.read(|d| d.history.clone()).await
    }

    pub async fn set_history(&self, history: History, save: bool) -> Result<(), Error> {
        self.update(save, |d| d.history = history).await
    }

    /// Append `entry` to the history of its address, unless already there.
    ///
    /// Return `true` if appended.
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn history_put_entry(&self, entry: HistoryEntry, save: bool) -> Result<bool, Error> {
        self.history_put_entries(vec![entry], save)
            .await
            .map(|n| n == 1)
    }

    /// Append many entries at once. Return the number of appended entries.
    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn history_put_entries<I>(&self, entries: I, save: bool) -> Result<usize, Error>
    where
        I: IntoIterator<Item = HistoryEntry>,
    {
        self.update(save, |d| {
            let mut appended: usize = 0;
            for entry in entries.into_iter() {
                let list = d.history.entry(entry.address.clone()).or_default();
                if !list.contains(&entry) {
                    list.push(entry);
                    appended += 1;
                }
            }
            appended
        })
        .await
    }

    pub async fn history_for_address<A>(&self, address: A) -> Result<Vec<HistoryEntry>, Error>
    where
        A: AsRef<str>,
    {
        self.read(|d| {
            d.history
                .get(address.as_ref())
                .cloned()
                .unwrap_or_default()
        })
        .await
    }

    /// Total donated to `address` (sats)
    pub async fn history_total_for_address<A>(&self, address: A) -> Result<u64, Error>
    where
        A: AsRef<str>,
    {
        self.read(|d| {
            d.history
                .get(address.as_ref())
                .map(|list| list.iter().map(|e| e.amount).sum::<u64>())
                .unwrap_or_default()
        })
        .await
    }
}
