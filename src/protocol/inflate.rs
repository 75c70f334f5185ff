//! Brotli inflation with adaptive output buffer growth.
//!
//! The frame header carries the compressed length but not the inflated
//! one, so decoding starts from a guessed capacity and doubles it each
//! time the decoder runs out of output space.

// ============================================================================
// Imports
// ============================================================================

use brotli_decompressor::{BrotliResult, brotli_decode};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default initial output capacity.
pub const DEFAULT_INFLATE_CAPACITY: usize = 4096;

/// Default number of decode attempts before giving up.
pub const DEFAULT_INFLATE_ATTEMPTS: u32 = 8;

// ============================================================================
// Inflater
// ============================================================================

/// Brotli decoder with a bounded buffer growth policy.
///
/// With the defaults the largest payload accepted is
/// `4096 << 7` = 512 KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflater {
    initial_capacity: usize,
    max_attempts: u32,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new(DEFAULT_INFLATE_CAPACITY, DEFAULT_INFLATE_ATTEMPTS)
    }
}

impl Inflater {
    /// Creates an inflater.
    ///
    /// A zero capacity or attempt count is raised to one.
    #[must_use]
    pub fn new(initial_capacity: usize, max_attempts: u32) -> Self {
        Self {
            initial_capacity: initial_capacity.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the initial output capacity.
    #[inline]
    #[must_use]
    pub const fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the maximum number of decode attempts.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Inflates a complete brotli stream.
    ///
    /// # Errors
    ///
    /// [`Error::DecompressionFailed`] if the stream is invalid or truncated,
    /// or if it does not fit after `max_attempts` doublings.
    pub fn inflate(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut capacity = self.initial_capacity;

        for attempt in 1..=self.max_attempts {
            let mut output = vec![0u8; capacity];
            let info = brotli_decode(input, &mut output);

            match info.result {
                BrotliResult::ResultSuccess => {
                    output.truncate(info.decoded_size);
                    trace!(
                        compressed = input.len(),
                        inflated = output.len(),
                        attempt,
                        "Brotli payload inflated"
                    );
                    return Ok(output);
                }
                BrotliResult::NeedsMoreOutput => {
                    trace!(capacity, attempt, "Inflate buffer too small, doubling");
                    capacity = capacity.saturating_mul(2);
                }
                _ => {
                    let end = info
                        .error_string
                        .iter()
                        .position(|b| *b == 0)
                        .unwrap_or(info.error_string.len());
                    let reason = String::from_utf8_lossy(&info.error_string[..end]);
                    return Err(Error::decompression_failed(if reason.is_empty() {
                        "invalid or truncated brotli stream".to_string()
                    } else {
                        reason.into_owned()
                    }));
                }
            }
        }

        Err(Error::decompression_failed(format!(
            "output exceeds {} bytes after {} attempts",
            capacity / 2,
            self.max_attempts
        )))
    }
}

/// Inflates `input` with the default growth policy.
///
/// # Errors
///
/// See [`Inflater::inflate`].
#[inline]
pub fn inflate_brotli(input: &[u8]) -> Result<Vec<u8>> {
    Inflater::default().inflate(input)
}

// ============================================================================
// Tests
// ============================================================================
