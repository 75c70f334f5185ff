//! Builder pattern for session configuration.
//!
//! Provides a fluent API for configuring and creating [`Session`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use blive::Session;
//!
//! # fn example() -> blive::Result<()> {
//! let session = Session::builder()
//!     .room_id(25348832)
//!     .max_reconnect(2)
//!     .heartbeat_interval(Duration::from_secs(30))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::resolver::{HostResolver, HttpResolver};

use super::config::SessionConfig;
use super::core::Session;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct SessionBuilder {
    /// Room to join; required.
    room_id: Option<u64>,
    /// Settings other than the room id.
    config: SessionConfig,
    /// Host resolver; defaults to [`HttpResolver`].
    resolver: Option<Arc<dyn HostResolver>>,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("room_id", &self.room_id)
            .field("config", &self.config)
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a builder with default settings and no room.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the room to join.
    #[inline]
    #[must_use]
    pub fn room_id(mut self, room_id: u64) -> Self {
        self.room_id = Some(room_id);
        self
    }

    /// Sets the user id sent in the auth request, 0 for guests.
    #[inline]
    #[must_use]
    pub fn user_id(mut self, user_id: u64) -> Self {
        self.config.user_id = user_id;
        self
    }

    /// Sets how many extra resolve-and-handshake rounds `connect` may run.
    #[inline]
    #[must_use]
    pub fn max_reconnect(mut self, max_reconnect: u32) -> Self {
        self.config.max_reconnect = max_reconnect;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Sets the per-host connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the client name carried in heartbeats.
    #[inline]
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    /// Sets the brotli initial capacity and attempt bound.
    #[inline]
    #[must_use]
    pub fn inflate(mut self, capacity: usize, attempts: u32) -> Self {
        self.config.inflate_capacity = capacity;
        self.config.inflate_attempts = attempts;
        self
    }

    /// Replaces every setting with `config`, including the room id.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.room_id = Some(config.room_id);
        self.config = config;
        self
    }

    /// Sets the host resolver.
    #[inline]
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Builds the session with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the room id is missing or zero, or the
    ///   heartbeat interval or connect timeout is zero
    /// - [`Error::ResolveFailed`] if the default resolver cannot be built
    pub fn build(self) -> Result<Session> {
        let config = self.validate()?;

        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(HttpResolver::new()?),
        };

        Session::from_parts(config, resolver)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionBuilder {
    /// Checks the settings and returns the final configuration.
    fn validate(&self) -> Result<SessionConfig> {
        let room_id = self.room_id.ok_or_else(|| {
            Error::invalid_argument(
                "room id is required. Use .room_id() to set it.\n\
                 Example: Session::builder().room_id(25348832)",
            )
        })?;

        if room_id == 0 {
            return Err(Error::invalid_argument("room id must be non-zero"));
        }

        if self.config.heartbeat_interval.is_zero() {
            return Err(Error::invalid_argument(
                "heartbeat interval must be non-zero",
            ));
        }

        if self.config.connect_timeout.is_zero() {
            return Err(Error::invalid_argument("connect timeout must be non-zero"));
        }

        Ok(SessionConfig {
            room_id,
            ..self.config.clone()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
