//! Error types for the live room client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use blive::{Result, Session, TokioScheduler};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.connect(TokioScheduler::shared()).await?;
//!     session.run(20).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Usage | [`Error::InvalidArgument`], [`Error::NotConnected`] |
//! | Connect | [`Error::ResolveFailed`], [`Error::AuthFailed`], [`Error::Scheduler`] |
//! | Framing | [`Error::ConnectionClosed`], [`Error::ShortRead`], [`Error::ProtocolViolation`] |
//! | Payload | [`Error::UnsupportedCompression`], [`Error::DecompressionFailed`], [`Error::MalformedCommand`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Invalid argument passed to a session operation.
    ///
    /// Returned for out-of-range event types, negative run counts other
    /// than `-1`, or invalid builder settings.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Operation requires a live connection.
    #[error("Session is not connected")]
    NotConnected,

    // ========================================================================
    // Connect Errors
    // ========================================================================
    /// Token and host discovery failed.
    ///
    /// Returned when the metadata request fails, its JSON is malformed,
    /// or no usable host survives resolution.
    #[error("Resolve failed: {message}")]
    ResolveFailed {
        /// Description of the resolve failure.
        message: String,
    },

    /// Every candidate host rejected or failed the auth handshake.
    #[error("Authentication failed after {attempts} candidate host(s)")]
    AuthFailed {
        /// Number of candidate hosts tried.
        attempts: usize,
    },

    /// The external scheduler refused to register a timer.
    #[error("Scheduler error: {message}")]
    Scheduler {
        /// Description of the scheduler failure.
        message: String,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Peer closed the connection or a read failed before any progress.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Fewer bytes arrived than the frame requires.
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes required.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Frame violates the wire protocol (unexpected operation, bad sizes).
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Command frame uses a compression scheme this client cannot decode.
    #[error("Unsupported compression: sub-protocol {sub_protocol}")]
    UnsupportedCompression {
        /// Raw sub-protocol code from the frame header.
        sub_protocol: u16,
    },

    /// Brotli inflation failed or exhausted its buffer growth bound.
    #[error("Decompression failed: {message}")]
    DecompressionFailed {
        /// Description of the decoder failure.
        message: String,
    },

    /// Command body is not JSON or lacks a string `cmd` field.
    #[error("Malformed command: {message}")]
    MalformedCommand {
        /// Description of the malformed body.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a resolve failed error.
    #[inline]
    pub fn resolve_failed(message: impl Into<String>) -> Self {
        Self::ResolveFailed {
            message: message.into(),
        }
    }

    /// Creates an auth failed error.
    #[inline]
    pub fn auth_failed(attempts: usize) -> Self {
        Self::AuthFailed { attempts }
    }

    /// Creates a scheduler error.
    #[inline]
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Creates a short read error.
    #[inline]
    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortRead { expected, actual }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates an unsupported compression error.
    #[inline]
    pub fn unsupported_compression(sub_protocol: u16) -> Self {
        Self::UnsupportedCompression { sub_protocol }
    }

    /// Creates a decompression failed error.
    #[inline]
    pub fn decompression_failed(message: impl Into<String>) -> Self {
        Self::DecompressionFailed {
            message: message.into(),
        }
    }

    /// Creates a malformed command error.
    #[inline]
    pub fn malformed_command(message: impl Into<String>) -> Self {
        Self::MalformedCommand {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the connection is unusable after this error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::NotConnected | Self::AuthFailed { .. } | Self::Io(_)
        )
    }

    /// Returns `true` if this error comes from frame-level decoding.
    ///
    /// Frame errors end a `run` loop.
    #[inline]
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ShortRead { .. } | Self::ProtocolViolation { .. }
        )
    }

    /// Returns `true` if this error only affects a single inbound frame.
    ///
    /// The run loop logs these and keeps reading.
    #[inline]
    #[must_use]
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCompression { .. }
                | Self::DecompressionFailed { .. }
                | Self::MalformedCommand { .. }
        )
    }

    /// Returns `true` if a fresh `connect` may succeed.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResolveFailed { .. }
                | Self::AuthFailed { .. }
                | Self::ConnectionClosed
                | Self::ShortRead { .. }
                | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
