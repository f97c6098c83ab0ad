//! Configuration file watcher for hot reload of failover rules.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::rules::FailoverRule;

/// A watcher that monitors the configuration file for rule changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Vec<FailoverRule>>,
    current: Vec<FailoverRule>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher seeded with the rules already in effect.
    ///
    /// Returns the watcher and a receiver for rule set updates.
    pub fn new(
        path: &Path,
        current: Vec<FailoverRule>,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<FailoverRule>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
                current,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let last = Mutex::new(self.current);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    tracing::info!("Config file change detected, reloading rules...");
                    match load_config(&path) {
                        Ok(config) => {
                            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                            if *last == config.rules {
                                tracing::debug!("Rule set unchanged");
                                return;
                            }
                            *last = config.rules.clone();
                            let _ = tx.send(config.rules);
                        }
                        Err(e) => {
                            tracing::error!(
                                "Failed to reload config: {}. Keeping current rules.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
