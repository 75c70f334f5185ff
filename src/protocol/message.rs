//! Control message bodies: auth, heartbeat, and popularity.
//!
//! # Formats
//!
//! | Message | Direction | Body |
//! |---------|-----------|------|
//! | Auth | Client → Server | `{"uid":0,"roomid":1,"protover":3,"platform":"web","type":2,"key":"..."}` |
//! | Auth reply | Server → Client | `{"code":0}` |
//! | Heartbeat | Client → Server | `{"msg":"blive-rs v0.1"}` |
//! | Heartbeat reply | Server → Client | 4-byte big-endian popularity, then an echo |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

use super::command::EventType;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version announced in the auth request (brotli-capable).
pub const PROTOCOL_VERSION: u8 = 3;

/// Platform announced in the auth request.
pub const PLATFORM: &str = "web";

/// Auth type announced in the auth request.
pub const AUTH_TYPE: u8 = 2;

/// Default client name carried in heartbeats.
pub const DEFAULT_CLIENT_NAME: &str = "blive-rs";

// ============================================================================
// AuthRequest
// ============================================================================

/// Authentication request sent right after the TCP connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// User id, 0 for guests.
    pub uid: u64,
    /// Room id.
    pub roomid: u64,
    /// Protocol version.
    pub protover: u8,
    /// Platform identifier.
    pub platform: String,
    /// Auth type.
    #[serde(rename = "type")]
    pub auth_type: u8,
    /// Token from the host resolver.
    pub key: String,
}

impl AuthRequest {
    /// Creates an auth request with the fixed protocol fields.
    #[must_use]
    pub fn new(uid: u64, roomid: u64, key: impl Into<String>) -> Self {
        Self {
            uid,
            roomid,
            protover: PROTOCOL_VERSION,
            platform: PLATFORM.to_string(),
            auth_type: AUTH_TYPE,
            key: key.into(),
        }
    }

    /// Serializes the request body.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if serialization fails.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

// ============================================================================
// AuthReply
// ============================================================================

/// Server reply to [`AuthRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AuthReply {
    /// Result code, 0 on success.
    pub code: i64,
}

impl AuthReply {
    /// Parses an auth reply body.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if the body is not JSON or `code` is missing or not
    /// an integer.
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Returns `true` if the server accepted the token.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == 0
    }
}

// ============================================================================
// HeartbeatRequest
// ============================================================================

/// Keep-alive body. The server echoes it back after the popularity value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatRequest {
    /// Client identification string.
    pub msg: String,
}

impl HeartbeatRequest {
    /// Creates a heartbeat tagged `"<client_name> v<major>.<minor>"`.
    #[must_use]
    pub fn new(client_name: &str) -> Self {
        Self {
            msg: format!(
                "{client_name} v{}.{}",
                env!("CARGO_PKG_VERSION_MAJOR"),
                env!("CARGO_PKG_VERSION_MINOR")
            ),
        }
    }

    /// Serializes the heartbeat body.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if serialization fails.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

// ============================================================================
// Popularity
// ============================================================================

/// Reads the popularity value from a heartbeat reply body.
///
/// # Errors
///
/// [`Error::ShortRead`] if the body holds fewer than 4 bytes.
pub fn parse_popularity(body: &[u8]) -> Result<u32> {
    match body.first_chunk::<4>() {
        Some(raw) => Ok(u32::from_be_bytes(*raw)),
        None => Err(Error::short_read(4, body.len())),
    }
}

/// Builds the synthesized popularity event value.
///
/// Shape: `{"cmd":"POP_VALUE_UPDATE","pop_value":N}`.
#[must_use]
pub fn popularity_event(value: u32) -> Value {
    json!({
        "cmd": EventType::PopValueUpdate.as_str(),
        "pop_value": value,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_request_body() {
        let body = AuthRequest::new(0, 25348832, "tok").to_body().expect("body");
        let value: Value = serde_json::from_slice(&body).expect("json");

        assert_eq!(
            value,
            json!({
                "uid": 0,
                "roomid": 25348832,
                "protover": 3,
                "platform": "web",
                "type": 2,
                "key": "tok",
            })
        );
    }

    #[test]
    fn test_auth_reply() {
        assert!(AuthReply::parse(br#"{"code":0}"#).expect("ok").is_success());
        assert!(!AuthReply::parse(br#"{"code":-101}"#).expect("ok").is_success());
        assert!(AuthReply::parse(br#"{"code":"0"}"#).is_err());
        assert!(AuthReply::parse(br#"{}"#).is_err());
        assert!(AuthReply::parse(b"not json").is_err());
    }

    #[test]
    fn test_heartbeat_body() {
        let body = HeartbeatRequest::new("tester").to_body().expect("body");
        let value: Value = serde_json::from_slice(&body).expect("json");
        let expected = format!(
            "tester v{}.{}",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR")
        );
        assert_eq!(value["msg"], expected);
    }

    #[test]
    fn test_parse_popularity() {
        assert_eq!(parse_popularity(&[0x00, 0x00, 0x01, 0x2C]).expect("pop"), 300);
        assert_eq!(
            parse_popularity(&[0x00, 0x00, 0x00, 0x01, b'{', b'}']).expect("pop"),
            1
        );
        assert!(matches!(
            parse_popularity(&[0x01, 0x02]),
            Err(Error::ShortRead {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_popularity_event_shape() {
        assert_eq!(
            popularity_event(300),
            json!({"cmd": "POP_VALUE_UPDATE", "pop_value": 300})
        );
    }
}
