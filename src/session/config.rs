//! Session configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use blive::SessionConfig;
//!
//! let config = SessionConfig::new(25348832)
//!     .with_user_id(0)
//!     .with_max_reconnect(2)
//!     .with_heartbeat_interval(Duration::from_secs(20));
//!
//! assert_eq!(config.room_id, 25348832);
//! assert_eq!(config.connect_timeout, Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::protocol::inflate::{DEFAULT_INFLATE_ATTEMPTS, DEFAULT_INFLATE_CAPACITY, Inflater};
use crate::protocol::message::DEFAULT_CLIENT_NAME;

// ============================================================================
// Constants
// ============================================================================

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default TCP connect timeout per candidate host.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SessionConfig
// ============================================================================

/// Settings for one live room session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// User id sent in the auth request, 0 for guests.
    pub user_id: u64,

    /// Room to join.
    pub room_id: u64,

    /// Additional resolve-and-handshake rounds after the first fails.
    pub max_reconnect: u32,

    /// Delay between heartbeats.
    pub heartbeat_interval: Duration,

    /// TCP connect timeout per candidate host.
    pub connect_timeout: Duration,

    /// Client name carried in heartbeat bodies.
    pub client_name: String,

    /// Initial brotli output capacity in bytes.
    pub inflate_capacity: usize,

    /// Brotli decode attempts before giving up.
    pub inflate_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SessionConfig {
    /// Creates a guest configuration for `room_id` with default settings.
    #[must_use]
    pub fn new(room_id: u64) -> Self {
        Self {
            user_id: 0,
            room_id,
            max_reconnect: 0,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            inflate_capacity: DEFAULT_INFLATE_CAPACITY,
            inflate_attempts: DEFAULT_INFLATE_ATTEMPTS,
        }
    }

    /// Returns the inflater these settings describe.
    #[inline]
    #[must_use]
    pub fn inflater(&self) -> Inflater {
        Inflater::new(self.inflate_capacity, self.inflate_attempts)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets the user id.
    #[inline]
    #[must_use]
    pub fn with_user_id(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the number of extra connect rounds.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect(mut self, max_reconnect: u32) -> Self {
        self.max_reconnect = max_reconnect;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the per-host connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the heartbeat client name.
    #[inline]
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Sets the brotli growth policy.
    #[inline]
    #[must_use]
    pub fn with_inflate(mut self, capacity: usize, attempts: u32) -> Self {
        self.inflate_capacity = capacity;
        self.inflate_attempts = attempts;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
