// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload::Layer as ReloadLayer;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, Layer};

use crate::util::dir;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Dir(#[from] dir::Error),
    #[error(transparent)]
    Logger(#[from] TryInitError),
}

fn targets_filter() -> Targets {
    let trace: bool = env::var("SPARECHANGE_TRACE") == Ok(String::from("true"));
    let level: Level = if trace { Level::TRACE } else { Level::DEBUG };
    Targets::new()
        .with_default(Level::WARN)
        .with_target("sparechange_core", level)
        .with_target("sparechange_sdk", level)
        .with_target("sparechange_sdk_sqlite", Level::INFO)
}

/// Daily folder and file name of a new log
fn log_file(logs_path: PathBuf, now: DateTime<Utc>) -> (PathBuf, String) {
    let path: PathBuf = logs_path.join(now.format("%Y-%m-%d").to_string());
    (path, format!("{}.log", now.timestamp()))
}

pub fn init<P>(base_path: P, stdout: bool) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path: PathBuf = dir::logs_path(base_path)?;
    let (path, file_name) = log_file(path, Utc::now());
    std::fs::create_dir_all(path.as_path())?;

    let file_appender = tracing_appender::rolling::never(path, file_name);
    let writer = BoxMakeWriter::new(file_appender);
    let file_log = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(false);
    let (file_log, ..) = ReloadLayer::new(file_log);

    let targets_filter = targets_filter();

    if stdout {
        let stdout_log = fmt::layer()
            .with_ansi(true)
            .with_file(false)
            .with_span_events(FmtSpan::CLOSE);
        tracing_subscriber::registry()
            .with(stdout_log.and_then(file_log).with_filter(targets_filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(file_log.with_filter(targets_filter))
            .try_init()?;
    };

    Ok(())
}

pub fn init_mobile() {
    #[cfg(target_os = "android")]
    let layer = fmt::layer().with_writer(paranoid_android::AndroidLogMakeWriter::new(
        "cash.sparechange.sdk".to_owned(),
    ));

    #[cfg(not(target_os = "android"))]
    let layer = fmt::layer();

    match tracing_subscriber::registry()
        .with(
            layer
                .with_ansi(false)
                .with_file(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(targets_filter()),
        )
        .try_init()
    {
        Ok(_) => tracing::info!("Logger initialized"),
        Err(e) => eprintln!("Impossible to init logger: {e}"),
    }
}
