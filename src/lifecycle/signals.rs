//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP, SIGUSR1)
//! - Translate signals into internal commands
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP and SIGUSR1 trigger a routing reload, never a shutdown
//! - The core only ever sees `ReloadHandle::trigger` and `Shutdown::trigger`,
//!   so it stays testable without real signals

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;
use crate::routing::reload::ReloadHandle;

/// Install the signal handlers and return the task that serves them.
#[cfg(unix)]
pub fn install(reload: ReloadHandle, shutdown: Arc<Shutdown>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut user1 = signal(SignalKind::user_defined1())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!(signal = "SIGHUP", "Reload requested");
                    reload.trigger();
                }
                _ = user1.recv() => {
                    tracing::info!(signal = "SIGUSR1", "Reload requested");
                    reload.trigger();
                }
                _ = terminate.recv() => {
                    tracing::info!(signal = "SIGTERM", "Shutdown requested");
                    shutdown.trigger();
                    break;
                }
                _ = interrupt.recv() => {
                    tracing::info!(signal = "SIGINT", "Shutdown requested");
                    shutdown.trigger();
                    break;
                }
            }
        }
    }))
}

/// Install the signal handlers and return the task that serves them.
///
/// Only Ctrl+C is available here; reloads must come from the file watcher.
#[cfg(not(unix))]
pub fn install(reload: ReloadHandle, shutdown: Arc<Shutdown>) -> std::io::Result<JoinHandle<()>> {
    let _ = reload;
    Ok(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!(signal = "ctrl-c", "Shutdown requested");
                shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    }))
}
