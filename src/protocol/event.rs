//! Classified events delivered to handlers.
//!
//! An [`Event`] pairs the [`EventType`] resolved from the command table
//! with the full JSON object the server pushed. [`Event::parse`] offers
//! typed views for the most common events; everything else is reachable
//! through the raw payload.
//!
//! # Payload Shapes
//!
//! | Event | Fields used |
//! |-------|-------------|
//! | `DANMU_MSG` | `info[1]` text, `info[2][0]` uid, `info[2][1]` name |
//! | `SEND_GIFT` | `data.uid`, `data.uname`, `data.giftName`, `data.num` |
//! | `INTERACT_WORD` | `data.uid`, `data.uname`, `data.msg_type` |
//! | `WATCHED_CHANGE` | `data.num` |
//! | `ONLINE_RANK_COUNT` | `data.count` |
//! | `LIKE_INFO_V3_UPDATE` | `data.click_count` |
//! | `POP_VALUE_UPDATE` | `pop_value` |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use super::command::EventType;

// ============================================================================
// Event
// ============================================================================

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event classification.
    pub event_type: EventType,
    /// Full JSON object, including `cmd`.
    pub payload: Value,
}

impl Event {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Returns the raw `cmd` string, which may carry a `:` suffix.
    #[inline]
    #[must_use]
    pub fn cmd(&self) -> &str {
        self.payload
            .get("cmd")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the `data` object, if present.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.payload.get("data")
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        self.parse_internal()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Typed views of frequently handled events.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Chat message.
    Danmaku {
        /// Sender user id.
        uid: u64,
        /// Sender display name.
        uname: String,
        /// Message text.
        text: String,
    },

    /// Gift sent.
    Gift {
        /// Sender user id.
        uid: u64,
        /// Sender display name.
        uname: String,
        /// Gift name.
        gift_name: String,
        /// Gift count.
        num: u64,
    },

    /// Viewer entered or followed.
    Interact {
        /// Viewer user id.
        uid: u64,
        /// Viewer display name.
        uname: String,
        /// 1 = entered, 2 = followed, 3 = shared.
        msg_type: u64,
    },

    /// Watched count.
    Watched {
        /// Number of viewers who watched.
        num: u64,
    },

    /// High-energy viewer count.
    OnlineRank {
        /// Viewer count.
        count: u64,
    },

    /// Like count.
    Likes {
        /// Total clicks.
        click_count: u64,
    },

    /// Popularity value from a heartbeat reply.
    Popularity {
        /// Popularity value.
        value: u64,
    },

    /// Any other classified event.
    Other {
        /// Event classification.
        event_type: EventType,
        /// Full payload.
        payload: Value,
    },
}

// ============================================================================
// Event Parsing Implementation
// ============================================================================

impl Event {
    fn parse_internal(&self) -> ParsedEvent {
        match self.event_type {
            EventType::DanmuMsg => ParsedEvent::Danmaku {
                uid: self.get_u64("/info/2/0"),
                uname: self.get_string("/info/2/1"),
                text: self.get_string("/info/1"),
            },

            EventType::SendGift => ParsedEvent::Gift {
                uid: self.get_u64("/data/uid"),
                uname: self.get_string("/data/uname"),
                gift_name: self.get_string("/data/giftName"),
                num: self.get_u64("/data/num"),
            },

            EventType::InteractWord => ParsedEvent::Interact {
                uid: self.get_u64("/data/uid"),
                uname: self.get_string("/data/uname"),
                msg_type: self.get_u64("/data/msg_type"),
            },

            EventType::WatchedChange => ParsedEvent::Watched {
                num: self.get_u64("/data/num"),
            },

            EventType::OnlineRankCount => ParsedEvent::OnlineRank {
                count: self.get_u64("/data/count"),
            },

            EventType::LikeInfoV3Update => ParsedEvent::Likes {
                click_count: self.get_u64("/data/click_count"),
            },

            EventType::PopValueUpdate => ParsedEvent::Popularity {
                value: self.get_u64("/pop_value"),
            },

            event_type => ParsedEvent::Other {
                event_type,
                payload: self.payload.clone(),
            },
        }
    }

    /// Gets a string at a JSON pointer.
    #[inline]
    fn get_string(&self, pointer: &str) -> String {
        self.payload
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 at a JSON pointer.
    #[inline]
    fn get_u64(&self, pointer: &str) -> u64 {
        self.payload
            .pointer(pointer)
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_danmaku_parsing() {
        let event = Event::new(
            EventType::DanmuMsg,
            json!({
                "cmd": "DANMU_MSG:4:0:2:2:2:0",
                "info": [[0, 1, 25, 16777215], "hello", [123456, "viewer", 0]]
            }),
        );

        assert_eq!(event.cmd(), "DANMU_MSG:4:0:2:2:2:0");
        assert_eq!(
            event.parse(),
            ParsedEvent::Danmaku {
                uid: 123456,
                uname: "viewer".to_string(),
                text: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_gift_parsing() {
        let event = Event::new(
            EventType::SendGift,
            json!({
                "cmd": "SEND_GIFT",
                "data": {"uid": 7, "uname": "fan", "giftName": "辣条", "num": 5}
            }),
        );

        match event.parse() {
            ParsedEvent::Gift {
                uid,
                uname,
                gift_name,
                num,
            } => {
                assert_eq!(uid, 7);
                assert_eq!(uname, "fan");
                assert_eq!(gift_name, "辣条");
                assert_eq!(num, 5);
            }
            other => panic!("unexpected parsed event: {other:?}"),
        }
    }

    #[test]
    fn test_popularity_parsing() {
        let event = Event::new(
            EventType::PopValueUpdate,
            json!({"cmd": "POP_VALUE_UPDATE", "pop_value": 300}),
        );
        assert_eq!(event.parse(), ParsedEvent::Popularity { value: 300 });
    }

    #[test]
    fn test_missing_fields_default() {
        let event = Event::new(EventType::WatchedChange, json!({"cmd": "WATCHED_CHANGE"}));
        assert_eq!(event.parse(), ParsedEvent::Watched { num: 0 });
        assert!(event.data().is_none());
    }

    #[test]
    fn test_other_keeps_payload() {
        let payload = json!({"cmd": "ROOM_CHANGE", "data": {"title": "new"}});
        let event = Event::new(EventType::RoomChange, payload.clone());

        match event.parse() {
            ParsedEvent::Other {
                event_type,
                payload: parsed,
            } => {
                assert_eq!(event_type, EventType::RoomChange);
                assert_eq!(parsed, payload);
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }
}
