//! Hot reload of the `[gateway]` section.
//!
//! Editors and config management tools often save by writing a temporary file
//! and renaming it over the original, which replaces the inode a file watch
//! would be attached to. The watch is therefore placed on the parent directory
//! and events are filtered by file name.
//!
//! Only `[gateway]` is live; every other section is read once at startup, so
//! a reload that changes nothing there is not forwarded.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{GatewayConfig, MatrixConfig};

/// Watches one config file and publishes changed Matrix settings.
pub struct ConfigWatcher {
    path: PathBuf,
    current: MatrixConfig,
    update_tx: mpsc::UnboundedSender<MatrixConfig>,
}

impl ConfigWatcher {
    /// `current` is what the server is running with; reloads are compared
    /// against the last settings sent.
    pub fn new(path: &Path, current: MatrixConfig) -> (Self, mpsc::UnboundedReceiver<MatrixConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;

        let file_name: OsString = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        let dir = watch_dir(&path);

        let reload_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_config_event(&event, &file_name) => {
                    let reloaded = match load_config(&reload_path) {
                        Ok(reloaded) => reloaded,
                        Err(e) => {
                            tracing::error!(path = ?reload_path, error = %e, "Config reload failed, keeping current settings");
                            return;
                        }
                    };
                    match gateway_update(&current, &reloaded) {
                        Some(settings) => {
                            tracing::info!(path = ?reload_path, base_url = %settings.base_url, "Config file changed");
                            current = settings.clone();
                            let _ = update_tx.send(settings);
                        }
                        None => tracing::debug!(path = ?reload_path, "Config file changed outside [gateway], ignored"),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A create, modify or rename touching a file called `file_name`.
fn is_config_event(event: &Event, file_name: &OsStr) -> bool {
    let relevant_kind = event.kind.is_create() || event.kind.is_modify();
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

/// The new Matrix settings, if `reloaded` changes them.
fn gateway_update(current: &MatrixConfig, reloaded: &GatewayConfig) -> Option<MatrixConfig> {
    (reloaded.gateway != *current).then(|| reloaded.gateway.clone())
}
