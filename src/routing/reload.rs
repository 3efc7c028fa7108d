//! Hot reload of the routing table.
//!
//! # Responsibilities
//! - Hold the currently published table behind an atomic pointer
//! - Rebuild the table from its source on request and publish it
//! - Keep the previous table when a rebuild fails
//!
//! # Design Decisions
//! - Readers never block: `current()` is a lock-free `ArcSwap` load
//! - Writers build a complete table off to the side, then swap once
//! - Reloads serialize on an async mutex; readers never touch it
//! - Triggers are coalesced through a capacity-1 channel so a burst of
//!   signals costs at most one extra reload and none is lost entirely

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{mpsc, watch, Mutex};

use crate::config::loader::ConfigError;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::table::RoutingTable;

/// Process-wide owner of the published routing table.
#[derive(Debug)]
pub struct ReloadController {
    source: PathBuf,
    current: ArcSwap<RoutingTable>,
    generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl ReloadController {
    /// Perform the mandatory first load. Failure here is fatal to startup.
    pub fn load(source: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let source = source.into();
        let table = RoutingTable::load(&source)?.with_generation(1);

        tracing::info!(
            path = ?source,
            virtual_hosts = table.len(),
            "Routing table loaded"
        );
        if table.is_empty() {
            tracing::warn!(path = ?source, "Routing table is empty; every request will miss");
        }

        Ok(Self {
            source,
            current: ArcSwap::from_pointee(table),
            generation: AtomicU64::new(1),
            reload_lock: Mutex::new(()),
        })
    }

    /// The most recently published table. Never blocks and never observes a
    /// partially built table; callers keep their snapshot for the whole
    /// request even if a reload publishes a newer one meanwhile.
    pub fn current(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    /// Where the table is loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Rebuild the table from its source and publish it.
    ///
    /// On error nothing is published and the previous table stays active.
    pub async fn reload(&self) -> Result<Arc<RoutingTable>, ConfigError> {
        let _serialized = self.reload_lock.lock().await;

        let outcome = match tokio::fs::read_to_string(&self.source).await {
            Ok(content) => RoutingTable::parse(&content),
            Err(source) => Err(ConfigError::Io {
                path: self.source.clone(),
                source,
            }),
        };

        match outcome {
            Ok(table) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let table = Arc::new(table.with_generation(generation));
                self.current.store(Arc::clone(&table));
                metrics::record_reload(true);
                tracing::info!(
                    generation,
                    virtual_hosts = table.len(),
                    "Routing table reloaded"
                );
                Ok(table)
            }
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    path = ?self.source,
                    error = %e,
                    generation = self.current.load().generation(),
                    "Failed to reload routing table; keeping current table"
                );
                Err(e)
            }
        }
    }

    /// Serve reload commands until shutdown or until every handle is dropped.
    pub async fn run(
        self: Arc<Self>,
        mut commands: ReloadCommands,
        mut stop: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                command = commands.rx.recv() => {
                    if command.is_none() {
                        break;
                    }
                    // Errors are logged by reload() and never end the loop.
                    let _ = self.reload().await;
                }
                _ = shutdown::signalled(&mut stop) => break,
            }
        }
        tracing::debug!("Reload controller stopped");
    }
}

/// Sending side of the reload command channel.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<()>,
}

impl ReloadHandle {
    /// Ask for a reload. Returns `false` once the controller has stopped.
    ///
    /// Safe to call from non-async contexts (signal tasks, watcher threads).
    pub fn trigger(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::debug!("Reload already pending; trigger coalesced");
                true
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Receiving side of the reload command channel.
#[derive(Debug)]
pub struct ReloadCommands {
    rx: mpsc::Receiver<()>,
}

/// Create the reload command channel.
pub fn reload_channel() -> (ReloadHandle, ReloadCommands) {
    let (tx, rx) = mpsc::channel(1);
    (ReloadHandle { tx }, ReloadCommands { rx })
}
