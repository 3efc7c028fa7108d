//! Relay session: one client connection paired with one backend connection.

use std::fmt;
use std::time::{Duration, Instant};

use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown;
use crate::net::connection::SessionGuard;
use crate::relay::frame::WireMessage;
use crate::relay::pump::{pump, CloseReason, Direction, PumpExit, StopSignal};

/// Everything a session logs about itself.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub virtual_host: String,
    pub backend: String,
}

/// A relay session between a client and a backend WebSocket.
///
/// Owns both connections for its whole life. Both are closed exactly once,
/// by the pump that writes to them, whichever side stops first.
pub struct RelaySession {
    guard: SessionGuard,
    info: SessionInfo,
    close_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl fmt::Debug for RelaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySession")
            .field("id", &self.guard.id())
            .field("info", &self.info)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

/// How a finished session went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: CloseReason,
    pub frames_to_backend: u64,
    pub frames_to_client: u64,
}

impl RelaySession {
    pub fn new(
        guard: SessionGuard,
        info: SessionInfo,
        close_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            guard,
            info,
            close_timeout,
            shutdown,
        }
    }

    /// Relay until either side closes or fails, or shutdown is signalled.
    pub async fn run<C, B, CM, BM, CE, BE>(self, client: C, backend: B) -> SessionSummary
    where
        C: Stream<Item = Result<CM, CE>> + Sink<CM, Error = CE> + Send + 'static,
        B: Stream<Item = Result<BM, BE>> + Sink<BM, Error = BE> + Send + 'static,
        CM: WireMessage + Unpin,
        BM: WireMessage + Unpin,
        CE: fmt::Display + Send + 'static,
        BE: fmt::Display + Send + 'static,
    {
        let RelaySession {
            guard,
            info,
            close_timeout,
            mut shutdown,
        } = self;
        let started = Instant::now();

        tracing::info!(
            session_id = %guard.id(),
            virtual_host = %info.virtual_host,
            backend = %info.backend,
            "Relay session started"
        );

        let (client_sink, client_stream) = client.split();
        let (backend_sink, backend_stream) = backend.split();
        let stop = StopSignal::new();

        let mut upstream = tokio::spawn(pump::<_, _, CM, BM, _, _>(
            Direction::ClientToBackend,
            client_stream,
            backend_sink,
            stop.clone(),
            close_timeout,
        ));
        let mut downstream = tokio::spawn(pump::<_, _, BM, CM, _, _>(
            Direction::BackendToClient,
            backend_stream,
            client_sink,
            stop.clone(),
            close_timeout,
        ));

        // A stuck peer gets the close timeout plus a little slack before
        // the pump is aborted outright.
        let grace = close_timeout + Duration::from_millis(250);

        let (reason, up, down) = tokio::select! {
            exit = &mut upstream => {
                let up = joined(exit, Direction::ClientToBackend);
                let down = finish(downstream, grace, Direction::BackendToClient).await;
                (first_cause(&up, &down), up, down)
            }
            exit = &mut downstream => {
                let down = joined(exit, Direction::BackendToClient);
                let up = finish(upstream, grace, Direction::ClientToBackend).await;
                (first_cause(&down, &up), up, down)
            }
            _ = shutdown::signalled(&mut shutdown) => {
                stop.trigger();
                let up = finish(upstream, grace, Direction::ClientToBackend).await;
                let down = finish(downstream, grace, Direction::BackendToClient).await;
                (CloseReason::Shutdown, up, down)
            }
        };

        let summary = SessionSummary {
            reason,
            frames_to_backend: up.frames,
            frames_to_client: down.frames,
        };

        match &summary.reason {
            CloseReason::Failed(e) => tracing::warn!(
                session_id = %guard.id(),
                virtual_host = %info.virtual_host,
                error = %e,
                frames_to_backend = summary.frames_to_backend,
                frames_to_client = summary.frames_to_client,
                duration_ms = started.elapsed().as_millis() as u64,
                "Relay session failed"
            ),
            reason => tracing::info!(
                session_id = %guard.id(),
                virtual_host = %info.virtual_host,
                reason = %reason,
                frames_to_backend = summary.frames_to_backend,
                frames_to_client = summary.frames_to_client,
                duration_ms = started.elapsed().as_millis() as u64,
                "Relay session closed"
            ),
        }

        drop(guard);
        summary
    }
}

/// The pump that observed the stop may finish before the one that caused it.
fn first_cause(first: &PumpExit, other: &PumpExit) -> CloseReason {
    match first.reason {
        CloseReason::Cancelled => other.reason.clone(),
        _ => first.reason.clone(),
    }
}

fn joined(exit: Result<PumpExit, tokio::task::JoinError>, direction: Direction) -> PumpExit {
    exit.unwrap_or_else(|e| {
        tracing::error!(direction = %direction, error = %e, "Relay pump task failed");
        PumpExit {
            direction,
            reason: CloseReason::Cancelled,
            frames: 0,
        }
    })
}

/// Wait for a pump that has been told to stop; abort it if it will not.
async fn finish(mut handle: JoinHandle<PumpExit>, grace: Duration, direction: Direction) -> PumpExit {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(exit) => joined(exit, direction),
        Err(_) => {
            tracing::warn!(direction = %direction, "Relay pump did not stop in time; aborting");
            handle.abort();
            PumpExit {
                direction,
                reason: CloseReason::Cancelled,
                frames: 0,
            }
        }
    }
}
