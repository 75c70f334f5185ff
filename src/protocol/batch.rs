//! Command batch decoding.
//!
//! A command frame body is either a single JSON object (uncompressed
//! sub-protocols) or, once inflated, a run of complete sub-frames laid
//! back-to-back, each with its own 16-byte header:
//!
//! ```text
//! ┌────────┬──────────┬────────┬──────────┬─────
//! │ header │ json ... │ header │ json ... │ ...
//! └────────┴──────────┴────────┴──────────┴─────
//!  <---- packet_size ---><---- packet_size --->
//! ```
//!
//! The inflated buffer is parsed as-is: the first sub-frame's header is not
//! stripped beforehand, every step consumes exactly one header plus body.
//!
//! [`CommandBatch`] walks the buffer lazily, checking each step against the
//! bytes that remain. Unknown `cmd` names are skipped. The first malformed
//! body or overrunning sub-frame yields an error and ends the batch; events
//! already yielded are unaffected.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

use super::command::EventType;
use super::event::Event;
use super::frame::{FrameHeader, HEADER_LEN};

// ============================================================================
// CommandBatch
// ============================================================================

/// Lazy iterator over the commands in one command frame.
#[derive(Debug, Clone)]
pub struct CommandBatch<'a> {
    /// Bytes not yet consumed.
    remaining: &'a [u8],
    /// Whether `remaining` holds header-prefixed sub-frames.
    framed: bool,
    /// Set once the batch is exhausted or aborted.
    done: bool,
}

impl<'a> CommandBatch<'a> {
    /// Batch over an uncompressed body holding one JSON command.
    #[inline]
    #[must_use]
    pub fn single(body: &'a [u8]) -> Self {
        Self {
            remaining: body,
            framed: false,
            done: false,
        }
    }

    /// Batch over an inflated buffer of header-prefixed sub-frames.
    #[inline]
    #[must_use]
    pub fn framed(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload,
            framed: true,
            done: false,
        }
    }

    /// Returns the number of bytes not yet consumed.
    #[inline]
    #[must_use]
    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    /// Splits off the next command body.
    fn next_body(&mut self) -> Option<Result<&'a [u8]>> {
        if !self.framed {
            self.done = true;
            return Some(Ok(std::mem::take(&mut self.remaining)));
        }

        if self.remaining.is_empty() {
            return None;
        }

        if self.remaining.len() < HEADER_LEN {
            return Some(Err(Error::malformed_command(format!(
                "{} trailing bytes cannot hold a sub-frame header",
                self.remaining.len()
            ))));
        }

        let header = match FrameHeader::decode(self.remaining) {
            Ok(header) => header,
            Err(e) => return Some(Err(e)),
        };

        let body_len = match header.body_len() {
            Ok(len) => len,
            Err(e) => {
                return Some(Err(Error::malformed_command(format!(
                    "invalid sub-frame header: {e}"
                ))));
            }
        };

        let start = usize::from(header.header_size);
        let end = start + body_len;
        if end > self.remaining.len() {
            return Some(Err(Error::malformed_command(format!(
                "sub-frame of {end} bytes overruns the {} remaining",
                self.remaining.len()
            ))));
        }

        let body = &self.remaining[start..end];
        self.remaining = &self.remaining[end..];
        Some(Ok(body))
    }
}

impl Iterator for CommandBatch<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            let body = match self.next_body()? {
                Ok(body) => body,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match classify(body) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Parses one command body and resolves its event type.
///
/// Returns `Ok(None)` for well-formed commands whose `cmd` is not in the
/// command table.
///
/// # Errors
///
/// [`Error::MalformedCommand`] if the body is not JSON or has no string
/// `cmd` field.
pub fn classify(body: &[u8]) -> Result<Option<Event>> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| Error::malformed_command(format!("invalid JSON body: {e}")))?;

    let cmd = payload
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed_command("missing string `cmd` field"))?;

    // Variants such as "DANMU_MSG:4:0:2:2:2:0" share the base name.
    let name = cmd.split(':').next().unwrap_or(cmd);

    match EventType::from_command(name) {
        Some(event_type) => Ok(Some(Event::new(event_type, payload))),
        None => {
            debug!(cmd, "Unrecognized command dropped");
            Ok(None)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
