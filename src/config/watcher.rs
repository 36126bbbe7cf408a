//! Configuration file watcher for hot reload.
//!
//! Only settings that can change without rebinding sockets or respawning the
//! recovery loop are applied live (the fault trap policy). Everything else is
//! picked up on restart.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;

/// Watches one configuration file and publishes validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<ServiceConfig>,
}

impl ConfigWatcher {
    /// Create a watcher and the receiving end of its update stream.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. The returned handle must be kept alive for as long as
    /// reloads are wanted; dropping it stops the watch.
    pub fn start(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, updates } = self;
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&reload_path, &updates);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn reload(path: &Path, updates: &mpsc::UnboundedSender<ServiceConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file changed, publishing reload");
            if updates.send(config).is_err() {
                tracing::debug!("No config consumer left, dropping reload");
            }
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to reload config, keeping current configuration"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_publishes_valid_config() {
        let dir = std::env::temp_dir().join(format!("sre-probes-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[fault_trap]\ncritical_markers = [\"REDIS_DOWN\"]\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        reload(&path, &tx);
        let config = rx.try_recv().unwrap();
        assert_eq!(config.fault_trap.critical_markers, vec!["REDIS_DOWN".to_string()]);

        // Invalid content is not published
        std::fs::write(&path, "[recovery]\ninterval_secs = 0\n").unwrap();
        reload(&path, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
