//! Frame I/O over a byte stream.
//!
//! Receiving is split into header and body so the caller can inspect the
//! operation before deciding how to treat the body. Sending goes through
//! [`FrameWriter`], which owns the outbound sequence counter.
//!
//! # Read Semantics
//!
//! | Situation | Header | Body |
//! |-----------|--------|------|
//! | EOF or error before any byte | `ConnectionClosed` | `ConnectionClosed` |
//! | EOF or error after partial data | `ShortRead` | `ShortRead` |
//! | Still incomplete after [`MAX_BODY_READ_ATTEMPTS`] reads | n/a | `ShortRead` |
//!
//! Headers are read until complete or EOF. Bodies get a bounded number of
//! reads so a stalled peer cannot keep one frame half-open forever.

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameHeader, HEADER_LEN, Operation};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of reads spent filling one body.
pub const MAX_BODY_READ_ATTEMPTS: usize = 3;

// ============================================================================
// Receive
// ============================================================================

/// Reads one frame header.
///
/// # Errors
///
/// - [`Error::ConnectionClosed`] if the stream ends or fails before any byte
/// - [`Error::ShortRead`] if it ends mid-header
pub async fn read_header<R>(reader: &mut R) -> Result<FrameHeader>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; HEADER_LEN];
    let mut filled = 0;

    while filled < HEADER_LEN {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => return Err(incomplete(HEADER_LEN, filled)),
            Ok(n) => filled += n,
            Err(e) => {
                debug!(error = %e, filled, "Header read failed");
                return Err(incomplete(HEADER_LEN, filled));
            }
        }
    }

    let header = FrameHeader::decode(&buf)?;
    trace!(
        packet_size = header.packet_size,
        header_size = header.header_size,
        sub_protocol = header.sub_protocol,
        operation = header.operation,
        sequence = header.sequence,
        "Frame header received"
    );
    Ok(header)
}

/// Reads exactly `len` body bytes in at most [`MAX_BODY_READ_ATTEMPTS`] reads.
///
/// # Errors
///
/// - [`Error::ConnectionClosed`] if no byte arrives
/// - [`Error::ShortRead`] if only part of the body arrives
pub async fn read_body<R>(reader: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut body = vec![0u8; len];
    if len == 0 {
        return Ok(body);
    }

    let mut filled = 0;
    for attempt in 1..=MAX_BODY_READ_ATTEMPTS {
        match reader.read(&mut body[filled..]).await {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == len {
                    return Ok(body);
                }
                trace!(filled, len, attempt, "Partial body read");
            }
            Err(e) => {
                debug!(error = %e, filled, len, "Body read failed");
                break;
            }
        }
    }

    Err(incomplete(len, filled))
}

/// Reads one complete frame.
///
/// Header bytes beyond [`HEADER_LEN`] are read and discarded.
///
/// # Errors
///
/// See [`read_header`] and [`read_body`]; inconsistent size fields are
/// [`Error::ProtocolViolation`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let header = read_header(reader).await?;
    let body_len = header.body_len()?;

    let extension = usize::from(header.header_size) - HEADER_LEN;
    if extension > 0 {
        read_body(reader, extension).await?;
    }

    let body = read_body(reader, body_len).await?;
    Ok(Frame { header, body })
}

#[inline]
fn incomplete(expected: usize, filled: usize) -> Error {
    if filled == 0 {
        Error::ConnectionClosed
    } else {
        Error::short_read(expected, filled)
    }
}

// ============================================================================
// FrameWriter
// ============================================================================

/// Outbound half of a connection plus the sequence counter.
///
/// The counter belongs to the writer rather than the stream, so it keeps
/// counting across [`shutdown`](Self::shutdown) and [`attach`](Self::attach).
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: Option<W>,
    sequence: u32,
}

impl<W> Default for FrameWriter<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> FrameWriter<W> {
    /// Creates a writer with no stream attached.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: None,
            sequence: 0,
        }
    }

    /// Attaches a stream, returning the previous one.
    #[inline]
    pub fn attach(&mut self, writer: W) -> Option<W> {
        self.inner.replace(writer)
    }

    /// Returns the sequence number the next frame will carry.
    #[inline]
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Sends one frame and returns the sequence number it carried.
    ///
    /// The sub-protocol follows the operation: auth and heartbeat use the
    /// heartbeat-auth code, everything else the raw command code.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no stream is attached
    /// - [`Error::ProtocolViolation`] if the body is too large
    /// - [`Error::Io`] if the write fails
    pub async fn send(&mut self, operation: Operation, body: &[u8]) -> Result<u32> {
        let writer = self.inner.as_mut().ok_or(Error::NotConnected)?;

        let sequence = self.sequence;
        let frame = Frame::new(operation, sequence, body)?;
        self.sequence = sequence.wrapping_add(1);

        writer.write_all(&frame.encode()).await?;
        writer.flush().await?;

        trace!(?operation, sequence, len = body.len(), "Frame sent");
        Ok(sequence)
    }

    /// Shuts down and drops the attached stream, if any.
    pub async fn shutdown(&mut self) {
        if let Some(mut writer) = self.inner.take()
            && let Err(e) = writer.shutdown().await
        {
            debug!(error = %e, "Write half shutdown failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
