//! Routing file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::routing::reload::ReloadHandle;

/// A watcher that turns changes to the routing file into reload triggers.
pub struct ConfigWatcher {
    path: PathBuf,
    reload: ReloadHandle,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher for `path`.
    pub fn new(path: &Path, reload: ReloadHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            reload,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// The parent directory is watched rather than the file itself, so that
    /// editors which replace the file by rename are still noticed.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let reload = self.reload.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    if relevant && touches(&event, &target) {
                        tracing::info!(path = ?target, "Routing file change detected");
                        if !reload.trigger() {
                            tracing::warn!("Reload controller is gone; ignoring file change");
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Routing file watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    let name = target.file_name();
    event
        .paths
        .iter()
        .any(|p| p == target || (name.is_some() && p.file_name() == name))
}
