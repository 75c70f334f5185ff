//! Live room session.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SessionBuilder`] |
//! | `config` | [`SessionConfig`] and defaults |
//! | `core` | [`Session`] lifecycle, read loop, and dispatch |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for session configuration.
pub mod builder;

/// Session configuration.
pub mod config;

/// Session lifecycle and read loop.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionBuilder;
pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_HEARTBEAT_INTERVAL, SessionConfig};
pub use self::core::{Handler, Session, StopHandle};
