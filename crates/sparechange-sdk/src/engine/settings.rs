// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use sparechange_core::storage::StorageBackend;
use sparechange_core::util::normalize_address;
use sparechange_core::{ChangeDef, Charity, DonationWallet};

use super::{Engine, Message};
use crate::store::History;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCheck {
    Applied,
    /// Threshold is unusually high: ask the user, then force it
    NeedsConfirmation,
}

/// Charity as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharityView {
    pub charity: Charity,
    /// Invalid charities are shown but never donated to
    pub is_valid: bool,
    /// Total donated so far (sats)
    pub donated: u64,
}

impl<W, S> Engine<W, S>
where
    W: DonationWallet,
    S: StorageBackend,
{
    pub async fn autodonate(&self) -> Result<bool, Error> {
        Ok(self.store.autodonate().await?)
    }

    /// Turn auto-donate on or off.
    ///
    /// Auto-donate needs a wallet without password.
    pub async fn set_autodonate(&self, enabled: bool) -> Result<(), Error> {
        if enabled && self.wallet.has_password() {
            return Err(Error::PasswordProtected);
        }

        let mut inner = self.lock().await;
        let was: bool = self.store.autodonate().await?;
        self.store.set_autodonate(enabled, true).await?;
        inner.suspended = 0;

        if was && !enabled {
            self.send(Message::AutoDonateDisabled);
        }

        tracing::info!("Auto-donate: {enabled}");

        Ok(())
    }

    /// The user started editing the charities: stop auto-donating
    pub async fn user_began_editing(&self) -> Result<(), Error> {
        let mut inner = self.lock().await;
        if self.store.autodonate().await? {
            self.disable_autodonate(&mut inner, false).await?;
        }
        Ok(())
    }

    pub async fn singletx(&self) -> Result<bool, Error> {
        Ok(self.store.singletx().await?)
    }

    pub async fn set_singletx(&self, singletx: bool) -> Result<(), Error> {
        let _inner = self.lock().await;
        Ok(self.store.set_singletx(singletx, true).await?)
    }

    pub async fn change_def(&self) -> Result<ChangeDef, Error> {
        Ok(self.store.change_def().await?)
    }

    /// Set the threshold (sats).
    ///
    /// High values need a confirmation, unless `force` or the warning has
    /// been turned off.
    pub async fn set_threshold(
        &self,
        threshold: u64,
        force: bool,
    ) -> Result<ThresholdCheck, Error> {
        let _inner = self.lock().await;

        let warn_high_amount: u64 = self.config.warn_high_amount().await;
        if !force && threshold >= warn_high_amount && self.store.warn_hi().await? {
            return Ok(ThresholdCheck::NeedsConfirmation);
        }

        let mut change_def: ChangeDef = self.store.change_def().await?;
        change_def.threshold = threshold;
        self.store.set_change_def(change_def, true).await?;

        Ok(ThresholdCheck::Applied)
    }

    /// Never ask again for high thresholds
    pub async fn never_warn_high_threshold(&self) -> Result<(), Error> {
        let _inner = self.lock().await;
        Ok(self.store.set_warn_hi(false, true).await?)
    }

    /// Minimum confirmations (`0` to disable)
    pub async fn set_min_age(&self, min_age: u32) -> Result<(), Error> {
        let _inner = self.lock().await;
        let mut change_def: ChangeDef = self.store.change_def().await?;
        change_def.min_age = min_age;
        Ok(self.store.set_change_def(change_def, true).await?)
    }

    pub async fn charities(&self) -> Result<Vec<CharityView>, Error> {
        let charities: Vec<Charity> = self.store.charities().await?;
        let history: History = self.store.history().await?;
        Ok(charities
            .into_iter()
            .map(|charity| CharityView {
                is_valid: self.wallet.is_valid_address(&charity.address),
                donated: history
                    .get(&charity.address)
                    .map(|entries| entries.iter().map(|e| e.amount).sum::<u64>())
                    .unwrap_or_default(),
                charity,
            })
            .collect())
    }

    async fn update_charities<F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Vec<Charity>) -> Result<R, Error>,
    {
        let _inner = self.lock().await;
        let mut charities: Vec<Charity> = self.store.charities().await?;
        let res: R = f(&mut charities)?;
        self.store.set_charities(charities, false).await?;
        self.refresh_scheduler(false).await?;
        self.store.save().await?;
        Ok(res)
    }

    /// Append a charity (a disabled placeholder if `None`). Return its index.
    pub async fn add_charity(&self, charity: Option<Charity>) -> Result<usize, Error> {
        self.update_charities(|charities| {
            let charity: Charity = match charity {
                Some(mut charity) => {
                    charity.address = normalize_address(&charity.address);
                    charity
                }
                None => Charity::placeholder(charities.len() + 1),
            };
            charities.push(charity);
            Ok(charities.len() - 1)
        })
        .await
    }

    /// Remove charities by index. Unknown indexes are skipped.
    ///
    /// Return the number of removed charities.
    pub async fn remove_charities(&self, indexes: &[usize]) -> Result<usize, Error> {
        let mut indexes: Vec<usize> = indexes.to_vec();
        indexes.sort_unstable_by(|a, b| b.cmp(a));
        indexes.dedup();

        self.update_charities(|charities| {
            let mut removed: usize = 0;
            for index in indexes.into_iter() {
                if index < charities.len() {
                    let charity = charities.remove(index);
                    tracing::info!("Removed charity {}", charity.name);
                    removed += 1;
                } else {
                    tracing::warn!("Charity #{index} not found");
                }
            }
            Ok(removed)
        })
        .await
    }

    /// Edit name and/or address of a charity
    pub async fn edit_charity(
        &self,
        index: usize,
        name: Option<String>,
        address: Option<String>,
    ) -> Result<(), Error> {
        self.update_charities(|charities| {
            let charity: &mut Charity = charities
                .get_mut(index)
                .ok_or(Error::CharityNotFound(index))?;
            if let Some(name) = name {
                charity.name = name.trim().to_string();
            }
            if let Some(address) = address {
                charity.address = normalize_address(&address);
            }
            Ok(())
        })
        .await
    }

    pub async fn set_charity_enabled(&self, index: usize, enabled: bool) -> Result<(), Error> {
        self.update_charities(|charities| {
            let charity: &mut Charity = charities
                .get_mut(index)
                .ok_or(Error::CharityNotFound(index))?;
            charity.enabled = enabled;
            Ok(())
        })
        .await
    }

    pub async fn history(&self) -> Result<History, Error> {
        Ok(self.store.history().await?)
    }

    /// Total donated to `address` (sats)
    pub async fn history_total<A>(&self, address: A) -> Result<u64, Error>
    where
        A: AsRef<str>,
    {
        Ok(self.store.history_total_for_address(address).await?)
    }
}
