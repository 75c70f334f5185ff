//! Frame header and frame codec.
//!
//! Every message on the wire is a fixed 16-byte header followed by a body.
//! All header integers are big-endian.
//!
//! ```text
//! Byte/     0       |       1       |       2       |       3       |
//!   +---------------+---------------+---------------+---------------+
//!  0| Packet size (header + body)                                   |
//!   +---------------+---------------+---------------+---------------+
//!  4| Header size (16)              | Sub-protocol                  |
//!   +---------------+---------------+---------------+---------------+
//!  8| Operation                                                     |
//!   +---------------+---------------+---------------+---------------+
//! 12| Sequence                                                      |
//!   +---------------+---------------+---------------+---------------+
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 16;

/// Largest packet this client accepts from the wire.
pub const MAX_PACKET_SIZE: u32 = 16 * 1024 * 1024;

// ============================================================================
// SubProtocol
// ============================================================================

/// Per-frame body encoding, distinct from the operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SubProtocol {
    /// Command frame, body is plain JSON.
    Raw = 0,
    /// Heartbeat or auth frame, body is uncompressed.
    HeartbeatAuth = 1,
    /// Command frame, body is zlib-compressed. Not decoded by this client.
    Zlib = 2,
    /// Command frame, body is brotli-compressed concatenated sub-frames.
    Brotli = 3,
}

impl SubProtocol {
    /// Converts a wire code to a sub-protocol.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Raw),
            1 => Some(Self::HeartbeatAuth),
            2 => Some(Self::Zlib),
            3 => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Returns the wire code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

// ============================================================================
// Operation
// ============================================================================

/// Functional category of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    /// Client keep-alive.
    Heartbeat = 2,
    /// Server keep-alive reply carrying the popularity value.
    HeartbeatReply = 3,
    /// Server push command (JSON event).
    Command = 5,
    /// Client authentication request.
    Auth = 7,
    /// Server authentication reply.
    AuthReply = 8,
}

impl Operation {
    /// Converts a wire code to an operation.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            2 => Some(Self::Heartbeat),
            3 => Some(Self::HeartbeatReply),
            5 => Some(Self::Command),
            7 => Some(Self::Auth),
            8 => Some(Self::AuthReply),
            _ => None,
        }
    }

    /// Returns the wire code.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Sub-protocol used when this client sends the operation.
    #[must_use]
    pub const fn outbound_protocol(self) -> SubProtocol {
        match self {
            Self::Heartbeat | Self::HeartbeatReply | Self::Auth | Self::AuthReply => {
                SubProtocol::HeartbeatAuth
            }
            Self::Command => SubProtocol::Raw,
        }
    }
}

// ============================================================================
// FrameHeader
// ============================================================================

/// Decoded frame header in host byte order.
///
/// Operation and sub-protocol are kept as raw codes so that frames with
/// unknown codes can still be framed and reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total packet size, header included.
    pub packet_size: u32,
    /// Header size, always [`HEADER_LEN`] for frames this client builds.
    pub header_size: u16,
    /// Raw sub-protocol code.
    pub sub_protocol: u16,
    /// Raw operation code.
    pub operation: u32,
    /// Sequence number.
    pub sequence: u32,
}

impl FrameHeader {
    /// Builds a header for an outbound body of `body_len` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if the packet would exceed [`MAX_PACKET_SIZE`].
    pub fn new(
        operation: Operation,
        sub_protocol: SubProtocol,
        sequence: u32,
        body_len: usize,
    ) -> Result<Self> {
        let packet_size = u32::try_from(HEADER_LEN + body_len)
            .ok()
            .filter(|size| *size <= MAX_PACKET_SIZE)
            .ok_or_else(|| {
                Error::protocol_violation(format!("body of {body_len} bytes is too large"))
            })?;

        Ok(Self {
            packet_size,
            header_size: HEADER_LEN as u16,
            sub_protocol: sub_protocol.as_u16(),
            operation: operation.as_u32(),
            sequence,
        })
    }

    /// Parses a header from the first [`HEADER_LEN`] bytes of `data`.
    ///
    /// # Errors
    ///
    /// [`Error::ShortRead`] if fewer than [`HEADER_LEN`] bytes are available.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some(raw) = data.get(..HEADER_LEN) else {
            return Err(Error::short_read(HEADER_LEN, data.len()));
        };

        Ok(Self {
            packet_size: u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
            header_size: u16::from_be_bytes([raw[4], raw[5]]),
            sub_protocol: u16::from_be_bytes([raw[6], raw[7]]),
            operation: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            sequence: u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]),
        })
    }

    /// Serializes the header into its 16-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.packet_size.to_be_bytes());
        buf[4..6].copy_from_slice(&self.header_size.to_be_bytes());
        buf[6..8].copy_from_slice(&self.sub_protocol.to_be_bytes());
        buf[8..12].copy_from_slice(&self.operation.to_be_bytes());
        buf[12..16].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    /// Returns the typed operation, if the code is known.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> Option<Operation> {
        Operation::from_u32(self.operation)
    }

    /// Returns the typed sub-protocol, if the code is known.
    #[inline]
    #[must_use]
    pub const fn protocol(&self) -> Option<SubProtocol> {
        SubProtocol::from_u16(self.sub_protocol)
    }

    /// Returns the number of body bytes that follow the header.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if the size fields are inconsistent or
    /// the packet exceeds [`MAX_PACKET_SIZE`].
    pub fn body_len(&self) -> Result<usize> {
        if usize::from(self.header_size) < HEADER_LEN {
            return Err(Error::protocol_violation(format!(
                "header size {} is below {HEADER_LEN}",
                self.header_size
            )));
        }
        if self.packet_size > MAX_PACKET_SIZE {
            return Err(Error::protocol_violation(format!(
                "packet size {} exceeds {MAX_PACKET_SIZE}",
                self.packet_size
            )));
        }

        self.packet_size
            .checked_sub(u32::from(self.header_size))
            .map(|len| len as usize)
            .ok_or_else(|| {
                Error::protocol_violation(format!(
                    "packet size {} is smaller than header size {}",
                    self.packet_size, self.header_size
                ))
            })
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A complete frame: header plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Frame body.
    pub body: Vec<u8>,
}

impl Frame {
    /// Creates an outbound frame using the operation's default sub-protocol.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if the body is too large.
    pub fn new(operation: Operation, sequence: u32, body: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_protocol(operation, operation.outbound_protocol(), sequence, body)
    }

    /// Creates a frame with an explicit sub-protocol.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if the body is too large.
    pub fn with_protocol(
        operation: Operation,
        sub_protocol: SubProtocol,
        sequence: u32,
        body: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let body = body.into();
        let header = FrameHeader::new(operation, sub_protocol, sequence, body.len())?;
        Ok(Self { header, body })
    }

    /// Serializes header followed by body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    /// Parses one complete frame from the front of `data`.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - [`Error::ShortRead`] if `data` ends before the frame does
    /// - [`Error::ProtocolViolation`] if the header sizes are inconsistent
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let header = FrameHeader::decode(data)?;
        let body_len = header.body_len()?;
        let start = usize::from(header.header_size);
        let end = start + body_len;

        let body = data
            .get(start..end)
            .ok_or_else(|| Error::short_read(end, data.len()))?;

        Ok((
            Self {
                header,
                body: body.to_vec(),
            },
            end,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_header_wire_layout() {
        let header = FrameHeader::new(Operation::Heartbeat, SubProtocol::HeartbeatAuth, 1, 15)
            .expect("header");

        assert_eq!(
            header.to_bytes(),
            [
                0x00, 0x00, 0x00, 0x1F, // packet size 31
                0x00, 0x10, // header size 16
                0x00, 0x01, // sub-protocol 1
                0x00, 0x00, 0x00, 0x02, // heartbeat
                0x00, 0x00, 0x00, 0x01, // sequence 1
            ]
        );
    }

    #[test]
    fn test_decode_short_input_never_panics() {
        let bytes = [0xFFu8; HEADER_LEN];
        for len in 0..HEADER_LEN {
            let err = FrameHeader::decode(&bytes[..len]).unwrap_err();
            match err {
                Error::ShortRead { expected, actual } => {
                    assert_eq!(expected, HEADER_LEN);
                    assert_eq!(actual, len);
                }
                other => panic!("expected ShortRead, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let frame = Frame::new(Operation::Auth, 7, b"{}".to_vec()).expect("frame");
        let mut bytes = frame.encode();
        bytes.extend_from_slice(b"trailing");

        let header = FrameHeader::decode(&bytes).expect("decode");
        assert_eq!(header, frame.header);
    }

    #[test]
    fn test_outbound_protocols() {
        assert_eq!(
            Operation::Auth.outbound_protocol(),
            SubProtocol::HeartbeatAuth
        );
        assert_eq!(
            Operation::Heartbeat.outbound_protocol(),
            SubProtocol::HeartbeatAuth
        );
        assert_eq!(Operation::Command.outbound_protocol(), SubProtocol::Raw);
    }

    #[test]
    fn test_body_len_rejects_inconsistent_sizes() {
        let mut header =
            FrameHeader::new(Operation::Command, SubProtocol::Raw, 0, 4).expect("header");
        assert_eq!(header.body_len().expect("len"), 4);

        header.packet_size = 10;
        assert!(matches!(
            header.body_len(),
            Err(Error::ProtocolViolation { .. })
        ));

        header.packet_size = 40;
        header.header_size = 8;
        assert!(matches!(
            header.body_len(),
            Err(Error::ProtocolViolation { .. })
        ));

        header.header_size = 16;
        header.packet_size = MAX_PACKET_SIZE + 1;
        assert!(matches!(
            header.body_len(),
            Err(Error::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_unknown_codes_survive_decode() {
        let mut bytes = Frame::new(Operation::Command, 0, Vec::new())
            .expect("frame")
            .encode();
        bytes[11] = 0x09;
        bytes[7] = 0x07;

        let header = FrameHeader::decode(&bytes).expect("decode");
        assert_eq!(header.op(), None);
        assert_eq!(header.protocol(), None);
        assert_eq!(header.operation, 9);
        assert_eq!(header.sub_protocol, 7);
    }

    #[test]
    fn test_frame_decode_reports_truncated_body() {
        let bytes = Frame::new(Operation::Command, 3, b"{\"cmd\":\"X\"}".to_vec())
            .expect("frame")
            .encode();

        let (frame, used) = Frame::decode(&bytes).expect("decode");
        assert_eq!(used, bytes.len());
        assert_eq!(frame.body, b"{\"cmd\":\"X\"}");

        let err = Frame::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::ShortRead { .. }));
    }

    proptest! {
        #[test]
        fn prop_header_round_trip(
            packet_size in any::<u32>(),
            header_size in any::<u16>(),
            sub_protocol in any::<u16>(),
            operation in any::<u32>(),
            sequence in any::<u32>(),
        ) {
            let header = FrameHeader {
                packet_size,
                header_size,
                sub_protocol,
                operation,
                sequence,
            };
            let decoded = FrameHeader::decode(&header.to_bytes()).expect("decode");
            prop_assert_eq!(decoded, header);
        }
    }
}
