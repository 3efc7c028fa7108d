//! WebSocket relay subsystem.
//!
//! # Data Flow
//! ```text
//! client socket ──read──▶ pump (client_to_backend) ──write──▶ backend socket
//! client socket ◀─write── pump (backend_to_client) ◀──read── backend socket
//! ```
//!
//! # Design Decisions
//! - Frames carry type and payload together (frame.rs)
//! - Exactly one reader and one writer per connection, so order is kept
//! - The first pump to stop signals the other; each pump closes the socket it
//!   writes to, so both sides are closed once
//! - Proxy shutdown stops every open session through the same signal

pub mod frame;
pub mod pump;
pub mod session;

pub use frame::{Frame, FrameError, FrameKind, WireMessage};
pub use pump::{CloseReason, Direction, RelayError, Side, StopSignal};
pub use session::{RelaySession, SessionInfo, SessionSummary};
