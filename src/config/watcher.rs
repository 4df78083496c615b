//! Configuration file watcher for hot policy reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::FlowControlConfig;

/// Monitors the configuration file and publishes each valid, changed version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<FlowControlConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FlowControlConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();
        // Editors often emit several events per save.
        let mut last_published: Option<FlowControlConfig> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if !event.paths.is_empty()
                    && !event.paths.iter().any(|p| p.file_name() == watched.file_name())
                {
                    return;
                }

                match load_config(&watched) {
                    Ok(new_config) if last_published.as_ref() == Some(&new_config) => {
                        tracing::debug!(path = ?watched, "Config unchanged, skipping reload");
                    }
                    Ok(new_config) => {
                        tracing::info!(path = ?watched, "Config reloaded");
                        last_published = Some(new_config.clone());
                        let _ = update_tx.send(new_config);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to reload config: {}. Keeping current policy.",
                            e
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
