//! One direction of a relay session.
//!
//! A pump owns the read half of its source connection and the write half of
//! its destination connection. It is the only reader of one and the only
//! writer of the other, so frames leave in exactly the order they arrived.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::watch;

use crate::observability::metrics;
use crate::relay::frame::{FrameError, FrameKind, WireMessage};

/// Direction of travel through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client_to_backend",
            Direction::BackendToClient => "backend_to_client",
        }
    }

    /// The side this direction reads from.
    pub fn source(&self) -> Side {
        match self {
            Direction::ClientToBackend => Side::Client,
            Direction::BackendToClient => Side::Backend,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Backend,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => f.write_str("client"),
            Side::Backend => f.write_str("backend"),
        }
    }
}

/// I/O failure inside a running relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("{direction}: read failed: {cause}")]
    Read { direction: Direction, cause: String },

    #[error("{direction}: write failed: {cause}")]
    Write { direction: Direction, cause: String },

    #[error("{direction}: {source}")]
    Frame {
        direction: Direction,
        #[source]
        source: FrameError,
    },
}

/// Why a pump, and with it the session, stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A close frame arrived from this side and was passed on.
    Closed(Side),
    /// This side's stream ended without a close frame.
    Disconnected(Side),
    /// Reading, converting or writing a frame failed.
    Failed(RelayError),
    /// The other pump stopped first.
    Cancelled,
    /// Graceful shutdown of the proxy.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Closed(side) => write!(f, "{} closed", side),
            CloseReason::Disconnected(side) => write!(f, "{} disconnected", side),
            CloseReason::Failed(e) => write!(f, "{}", e),
            CloseReason::Cancelled => f.write_str("cancelled"),
            CloseReason::Shutdown => f.write_str("proxy shutting down"),
        }
    }
}

/// Termination signal shared by both pumps of a session.
///
/// Whoever stops first publishes it; everyone else observes it.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal has been triggered.
    pub async fn stopped(&mut self) {
        // The sender lives as long as any clone of self, so this only
        // returns once the value is true.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// What a pump reports when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpExit {
    pub direction: Direction,
    pub reason: CloseReason,
    pub frames: u64,
}

/// Move frames from `source` to `sink` until either fails, a close frame
/// passes through, or `stop` is triggered. Then publish `stop` and close
/// `sink`, waiting at most `close_timeout` for the peer.
pub async fn pump<S, D, In, Out, RE, WE>(
    direction: Direction,
    mut source: S,
    mut sink: D,
    mut stop: StopSignal,
    close_timeout: Duration,
) -> PumpExit
where
    S: Stream<Item = Result<In, RE>> + Unpin,
    D: Sink<Out, Error = WE> + Unpin,
    In: WireMessage,
    Out: WireMessage,
    RE: fmt::Display,
    WE: fmt::Display,
{
    let mut frames = 0u64;

    let reason = loop {
        let next = tokio::select! {
            next = source.next() => next,
            _ = stop.stopped() => break CloseReason::Cancelled,
        };

        let frame = match next {
            None => break CloseReason::Disconnected(direction.source()),
            Some(Err(e)) => {
                break CloseReason::Failed(RelayError::Read {
                    direction,
                    cause: e.to_string(),
                })
            }
            Some(Ok(message)) => match message.into_frame() {
                Some(frame) => frame,
                None => continue,
            },
        };

        let closing = frame.kind == FrameKind::Close;
        let message = match Out::from_frame(frame) {
            Ok(message) => message,
            Err(source) => break CloseReason::Failed(RelayError::Frame { direction, source }),
        };

        let written = tokio::select! {
            written = sink.send(message) => written,
            _ = stop.stopped() => break CloseReason::Cancelled,
        };
        if let Err(e) = written {
            break CloseReason::Failed(RelayError::Write {
                direction,
                cause: e.to_string(),
            });
        }

        frames += 1;
        metrics::record_frame(direction.as_str());

        if closing {
            break CloseReason::Closed(direction.source());
        }
    };

    stop.trigger();

    match tokio::time::timeout(close_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(direction = %direction, error = %e, "Close after relay failed"),
        Err(_) => tracing::debug!(direction = %direction, "Close after relay timed out"),
    }

    PumpExit {
        direction,
        reason,
        frames,
    }
}
