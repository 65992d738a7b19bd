// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Live configuration snapshot.
//!
//! The agent validates the file once at startup and then re-reads it on an
//! interval. Only `concurrent_size` is consumed live, through [`RateCeiling`];
//! everything else is fixed when the dispatcher is built.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::ConfigError;
use crate::speed_control::RateCeiling;

pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ConfigAgent {
    path: PathBuf,
    current: RwLock<Arc<Config>>,
}

impl ConfigAgent {
    /// Loads and validates the configuration at `path`.
    pub fn start(path: &Path) -> Result<Arc<Self>, ConfigError> {
        let config = Config::load(path)?;
        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            current: RwLock::new(Arc::new(config)),
        }))
    }

    pub fn config(&self) -> Result<Arc<Config>, ConfigError> {
        let current = self.current.read().map_err(|_| ConfigError::Poisoned)?;
        Ok(Arc::clone(&current))
    }

    /// Re-reads the file. Returns whether the snapshot changed.
    ///
    /// On error the previous snapshot stays in place.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        let next = Config::read(&self.path)?;
        let mut current = self.current.write().map_err(|_| ConfigError::Poisoned)?;
        if **current == next {
            return Ok(false);
        }
        *current = Arc::new(next);
        Ok(true)
    }

    /// Reloads every `every` until `cancel` fires.
    pub async fn watch(self: Arc<Self>, every: Duration, cancel: CancellationToken) {
        let mut ticker = interval(every);
        ticker.tick().await; // first tick is instantaneous

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Config agent stopped");
                    break;
                }
                _ = ticker.tick() => match self.reload() {
                    Ok(true) => info!(path = %self.path.display(), "Configuration reloaded"),
                    Ok(false) => {}
                    Err(e) => error!("Failed to reload configuration, keeping previous one: {e}"),
                },
            }
        }
    }
}

impl RateCeiling for ConfigAgent {
    fn rate_ceiling(&self) -> Result<i64, ConfigError> {
        Ok(self.config()?.concurrent_size)
    }
}
