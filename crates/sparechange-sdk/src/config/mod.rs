// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sparechange_core::constants::WARN_HIGH_AMOUNT;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::constants::{CHECK_INTERVAL, DEFAULT_LABEL};
use crate::util::dir;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Dir(#[from] dir::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("check interval can't be zero")]
    InvalidCheckInterval,
    #[error("label can't be empty")]
    EmptyLabel,
}

#[derive(Serialize, Deserialize)]
struct DonationFile {
    check_interval_secs: u64,
    warn_high_amount: u64,
    label: String,
}

#[derive(Serialize, Deserialize)]
struct ConfigFile {
    donation: DonationFile,
}

#[derive(Debug, Clone)]
pub struct Donation {
    pub check_interval: Arc<RwLock<Duration>>,
    /// Thresholds at or above this value ask for a confirmation (sats)
    pub warn_high_amount: Arc<RwLock<u64>>,
    /// Prefix of the wallet label of every donation
    pub label: Arc<RwLock<String>>,
}

impl Default for Donation {
    fn default() -> Self {
        Self {
            check_interval: Arc::new(RwLock::new(CHECK_INTERVAL)),
            warn_high_amount: Arc::new(RwLock::new(WARN_HIGH_AMOUNT)),
            label: Arc::new(RwLock::new(DEFAULT_LABEL.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub config_file_path: PathBuf,
    pub donation: Donation,
}

impl Config {
    /// Try to get config from file, otherwise will return the default configs
    pub fn try_from_file<P>(base_path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let config_file_path: PathBuf = dir::config_file_path(base_path)?;

        if config_file_path.exists() {
            let mut file: File = File::open(config_file_path.as_path())?;
            let mut content: Vec<u8> = Vec::new();
            file.read_to_end(&mut content)?;

            match serde_json::from_slice::<ConfigFile>(&content) {
                Ok(config_file) => {
                    let donation = config_file.donation;
                    return Ok(Self {
                        config_file_path,
                        donation: Donation {
                            check_interval: Arc::new(RwLock::new(Duration::from_secs(
                                donation.check_interval_secs.max(1),
                            ))),
                            warn_high_amount: Arc::new(RwLock::new(donation.warn_high_amount)),
                            label: Arc::new(RwLock::new(donation.label)),
                        },
                    });
                }
                Err(e) => tracing::error!("Impossible to deserialize config file: {e}"),
            };
        }

        tracing::warn!("Using default config");

        Ok(Self {
            config_file_path,
            donation: Donation::default(),
        })
    }

    async fn to_config_file(&self) -> ConfigFile {
        ConfigFile {
            donation: DonationFile {
                check_interval_secs: self.donation.check_interval.read().await.as_secs(),
                warn_high_amount: *self.donation.warn_high_amount.read().await,
                label: self.donation.label.read().await.clone(),
            },
        }
    }

    #[tracing::instrument(skip_all, level = "trace")]
    pub async fn save(&self) -> Result<(), Error> {
        let config_file: ConfigFile = self.to_config_file().await;
        let data: Vec<u8> = serde_json::to_vec(&config_file)?;
        let mut file: File = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.config_file_path.as_path())?;
        file.write_all(&data)?;
        Ok(())
    }

    pub async fn set_check_interval(&self, interval: Duration) -> Result<(), Error> {
        if interval.is_zero() {
            return Err(Error::InvalidCheckInterval);
        }
        let mut i = self.donation.check_interval.write().await;
        *i = interval;
        Ok(())
    }

    pub async fn check_interval(&self) -> Duration {
        *self.donation.check_interval.read().await
    }

    pub async fn set_warn_high_amount(&self, amount: u64) {
        let mut a = self.donation.warn_high_amount.write().await;
        *a = amount;
    }

    pub async fn warn_high_amount(&self) -> u64 {
        *self.donation.warn_high_amount.read().await
    }

    pub async fn set_label<S>(&self, label: S) -> Result<(), Error>
    where
        S: Into<String>,
    {
        let label: String = label.into();
        if label.trim().is_empty() {
            return Err(Error::EmptyLabel);
        }
        let mut l = self.donation.label.write().await;
        *l = label;
        Ok(())
    }

    pub async fn label(&self) -> String {
        self.donation.label.read().await.clone()
    }

    pub async fn as_pretty_json(&self) -> Result<String, Error> {
        let config_file: ConfigFile = self.to_config_file().await;
        Ok(serde_json::to_string_pretty(&config_file)?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        let config = Config::try_from_file(path).unwrap();
        assert_eq!(config.check_interval().await, Duration::from_secs(10));
        assert_eq!(config.warn_high_amount().await, 200_000);
        assert_eq!(config.label().await, "Donate Change");
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        let config = Config::try_from_file(path).unwrap();
        config
            .set_check_interval(Duration::from_secs(30))
            .await
            .unwrap();
        config.set_warn_high_amount(500_000).await;
        config.set_label("Spare change").await.unwrap();
        config.save().await.unwrap();

        let config = Config::try_from_file(path).unwrap();
        assert_eq!(config.check_interval().await, Duration::from_secs(30));
        assert_eq!(config.warn_high_amount().await, 500_000);
        assert_eq!(config.label().await, "Spare change");
    }

    #[tokio::test]
    async fn test_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        let config = Config::try_from_file(path).unwrap();
        assert!(matches!(
            config.set_check_interval(Duration::ZERO).await,
            Err(Error::InvalidCheckInterval)
        ));
        assert!(matches!(config.set_label("  ").await, Err(Error::EmptyLabel)));

        std::fs::write(&config.config_file_path, b"not json").unwrap();
        let config = Config::try_from_file(path).unwrap();
        assert_eq!(config.check_interval().await, Duration::from_secs(10));
    }
}
