//! Wire protocol for the live push service.
//!
//! This module defines the frame format and the payloads exchanged with a
//! push server over a plain TCP connection.
//!
//! # Protocol Overview
//!
//! | Operation | Code | Direction | Body |
//! |-----------|------|-----------|------|
//! | `Heartbeat` | 2 | Client → Server | `{"msg":"..."}` |
//! | `HeartbeatReply` | 3 | Server → Client | 4-byte popularity |
//! | `Command` | 5 | Server → Client | JSON command(s), maybe brotli |
//! | `Auth` | 7 | Client → Server | auth JSON |
//! | `AuthReply` | 8 | Server → Client | `{"code":0}` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | 16-byte header and frame codec |
//! | `inflate` | Brotli inflation with buffer growth |
//! | `batch` | Command batch cursor |
//! | `command` | `cmd` name to [`EventType`] table |
//! | `message` | Auth and heartbeat bodies |
//! | `event` | [`Event`] and [`ParsedEvent`] |

// ============================================================================
// Submodules
// ============================================================================

/// Command batch decoding.
pub mod batch;

/// Command table.
pub mod command;

/// Event types delivered to handlers.
pub mod event;

/// Frame header and frame codec.
pub mod frame;

/// Brotli inflation.
pub mod inflate;

/// Control message bodies.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use batch::CommandBatch;
pub use command::EventType;
pub use event::{Event, ParsedEvent};
pub use frame::{Frame, FrameHeader, HEADER_LEN, MAX_PACKET_SIZE, Operation, SubProtocol};
pub use inflate::{Inflater, inflate_brotli};
pub use message::{AuthReply, AuthRequest, HeartbeatRequest};
