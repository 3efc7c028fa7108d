//! Relay frames.
//!
//! A [`Frame`] is the unit a pump moves: the frame type and its payload as
//! one value. Both WebSocket stacks in play (axum on the client side,
//! tokio-tungstenite on the backend side) convert into and out of it, so a
//! pump never handles a type without its payload.

use axum::body::Bytes;
use axum::extract::ws;
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// WebSocket frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    Binary,
    Ping,
    Pong,
    Close,
}

/// One complete WebSocket message: type and payload, never separated.
///
/// Close payloads use the wire layout: a big-endian status code followed by
/// a UTF-8 reason, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(FrameKind::Text, text.into())
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Binary, payload)
    }

    /// A close frame, with an optional status code and reason.
    pub fn close(status: Option<(u16, &str)>) -> Self {
        let payload = match status {
            Some((code, reason)) => {
                let mut buf = Vec::with_capacity(2 + reason.len());
                buf.extend_from_slice(&code.to_be_bytes());
                buf.extend_from_slice(reason.as_bytes());
                Bytes::from(buf)
            }
            None => Bytes::new(),
        };
        Self::new(FrameKind::Close, payload)
    }

    /// Status code and reason of a close frame, if it carries one.
    pub fn close_status(&self) -> Option<(u16, String)> {
        if self.kind != FrameKind::Close || self.payload.len() < 2 {
            return None;
        }
        let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
        let reason = String::from_utf8_lossy(&self.payload[2..]).into_owned();
        Some((code, reason))
    }

    fn into_text(self) -> Result<String, FrameError> {
        String::from_utf8(self.payload.to_vec()).map_err(|_| FrameError::InvalidText)
    }
}

/// A frame that cannot be expressed on the destination connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("text frame payload is not valid UTF-8")]
    InvalidText,
}

/// A message type of a WebSocket stack that can carry a [`Frame`].
pub trait WireMessage: Sized + Send + 'static {
    /// `None` for stack-internal messages that are not frames on the wire.
    fn into_frame(self) -> Option<Frame>;

    fn from_frame(frame: Frame) -> Result<Self, FrameError>;
}

impl WireMessage for ws::Message {
    fn into_frame(self) -> Option<Frame> {
        let frame = match self {
            ws::Message::Text(text) => Frame::text(text.as_str()),
            ws::Message::Binary(payload) => Frame::binary(payload),
            ws::Message::Ping(payload) => Frame::new(FrameKind::Ping, payload),
            ws::Message::Pong(payload) => Frame::new(FrameKind::Pong, payload),
            ws::Message::Close(status) => {
                Frame::close(status.as_ref().map(|c| (c.code, c.reason.as_str())))
            }
        };
        Some(frame)
    }

    fn from_frame(frame: Frame) -> Result<Self, FrameError> {
        let message = match frame.kind {
            FrameKind::Text => ws::Message::Text(frame.into_text()?.into()),
            FrameKind::Binary => ws::Message::Binary(frame.payload),
            FrameKind::Ping => ws::Message::Ping(frame.payload),
            FrameKind::Pong => ws::Message::Pong(frame.payload),
            FrameKind::Close => ws::Message::Close(frame.close_status().map(|(code, reason)| {
                ws::CloseFrame {
                    code,
                    reason: reason.into(),
                }
            })),
        };
        Ok(message)
    }
}

impl WireMessage for tungstenite::Message {
    fn into_frame(self) -> Option<Frame> {
        let frame = match self {
            tungstenite::Message::Text(text) => Frame::text(text.as_str()),
            tungstenite::Message::Binary(payload) => Frame::binary(payload),
            tungstenite::Message::Ping(payload) => Frame::new(FrameKind::Ping, payload),
            tungstenite::Message::Pong(payload) => Frame::new(FrameKind::Pong, payload),
            tungstenite::Message::Close(status) => Frame::close(
                status
                    .as_ref()
                    .map(|c| (u16::from(c.code), c.reason.as_str())),
            ),
            // Raw frames are only produced for writing, never by a reader.
            tungstenite::Message::Frame(_) => return None,
        };
        Some(frame)
    }

    fn from_frame(frame: Frame) -> Result<Self, FrameError> {
        let message = match frame.kind {
            FrameKind::Text => tungstenite::Message::text(frame.into_text()?),
            FrameKind::Binary => tungstenite::Message::Binary(frame.payload),
            FrameKind::Ping => tungstenite::Message::Ping(frame.payload),
            FrameKind::Pong => tungstenite::Message::Pong(frame.payload),
            FrameKind::Close => {
                tungstenite::Message::Close(frame.close_status().map(|(code, reason)| {
                    tungstenite::protocol::CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    }
                }))
            }
        };
        Ok(message)
    }
}
