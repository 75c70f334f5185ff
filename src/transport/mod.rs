//! Transport layer: frame I/O, host discovery, and timers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   HTTPS getDanmuInfo   ┌─────────────────┐
//! │                 │───────────────────────►│  Metadata API   │
//! │    Session      │◄─── token + hosts ─────│                 │
//! │                 │                        └─────────────────┘
//! │  FrameWriter ───┼──── TCP frames ───────►┌─────────────────┐
//! │  read_frame  ◄──┼────────────────────────│  Push server    │
//! └─────────────────┘                        └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Header/body receive and frame send |
//! | `resolver` | Token and host discovery |
//! | `scheduler` | One-shot delayed tasks for the heartbeat |

// ============================================================================
// Submodules
// ============================================================================

/// Frame I/O over a byte stream.
pub mod connection;

/// Token and host discovery.
pub mod resolver;

/// One-shot delayed task scheduling.
pub mod scheduler;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{FrameWriter, read_body, read_frame, read_header};
pub use resolver::{
    Credentials, DanmuInfo, HostCandidate, HostRecord, HostResolver, HttpResolver, StaticResolver,
};
pub use scheduler::{ScheduleHandle, Scheduler, Task, TokioScheduler};
