//! Bilibili live room message stream client.
//!
//! This library connects to the live push service of a room, keeps the
//! session alive with heartbeats, and delivers decoded events to handlers.
//!
//! # Architecture
//!
//! The client talks to two remote ends:
//!
//! - **Metadata API (HTTPS)**: Issues an auth token and candidate push hosts
//! - **Push server (TCP)**: Streams framed, optionally brotli-compressed events
//!
//! Key design principles:
//!
//! - One [`Session`] per room, every operation on `&self`
//! - Timers come from an application-supplied [`Scheduler`]
//! - Host discovery behind the [`HostResolver`] trait
//! - Handlers indexed by the closed [`EventType`] set
//!
//! # Quick Start
//!
//! ```no_run
//! use blive::{EventType, ParsedEvent, Result, Session, TokioScheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::builder().room_id(25348832).build()?;
//!
//!     session.set_handler(EventType::DanmuMsg, |_, event| {
//!         if let ParsedEvent::Danmaku { uname, text, .. } = event.parse() {
//!             println!("{uname}: {text}");
//!         }
//!     });
//!
//!     session.connect(TokioScheduler::shared()).await?;
//!     session.run(100).await?;
//!     session.close().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Frame codec, compression, command table |
//! | [`session`] | [`Session`], [`SessionBuilder`], [`SessionConfig`] |
//! | [`transport`] | Frame I/O, host resolver, scheduler |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol: frames, compression, commands, events.
pub mod protocol;

/// Live room session.
///
/// Use [`Session::builder()`] to create a configured session.
pub mod session;

/// Frame I/O, host discovery, and scheduling.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{Event, EventType, Frame, FrameHeader, Operation, ParsedEvent, SubProtocol};

// Session types
pub use session::{Handler, Session, SessionBuilder, SessionConfig, StopHandle};

// Transport types
pub use transport::{
    Credentials, HostCandidate, HostResolver, HttpResolver, ScheduleHandle, Scheduler,
    StaticResolver, TokioScheduler,
};
