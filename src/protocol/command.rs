//! Command table: wire `cmd` names to event types.
//!
//! Inbound command frames carry a JSON object whose `cmd` string names the
//! event. The table below is the closed set of events this client
//! classifies; anything else is dropped by the batch decoder.
//!
//! `POP_VALUE_UPDATE` never appears on the wire. The session synthesizes it
//! from heartbeat replies so that popularity updates share the same
//! handler path as pushed commands.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// EventType
// ============================================================================

/// Application-facing classification of an inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EventType {
    /// Chat message (danmaku).
    DanmuMsg,
    /// Viewer entered the room or followed.
    InteractWord,
    /// Gift sent.
    SendGift,
    /// Gift star milestone lit.
    GiftStarProcess,
    /// Gift combo.
    ComboSend,
    /// Broadcast notice.
    NoticeMsg,
    /// Streamer went offline / is preparing.
    Preparing,
    /// Streamer info (fans, club) updated.
    RoomRealTimeMessageUpdate,
    /// High-energy viewer count.
    OnlineRankCount,
    /// Viewer reached the top three of the rank.
    OnlineRankTop3,
    /// Viewer clicked like.
    LikeInfoV3Click,
    /// Total like count.
    LikeInfoV3Update,
    /// Red envelope announced.
    PopularityRedPocketStart,
    /// Red envelope sent.
    PopularityRedPocketNew,
    /// Red envelope winners.
    PopularityRedPocketWinnerList,
    /// Watched count changed.
    WatchedChange,
    /// Entry effect for a viewer.
    EntryEffect,
    /// Room rank in its area changed.
    AreaRankChanged,
    /// Area rank congratulation notice.
    CommonNoticeDanmaku,
    /// Room title/area changed.
    RoomChange,
    /// Super chat entrance toggled.
    SuperChatEntrance,
    /// Top banner widget.
    WidgetBanner,
    /// Rooms that stopped streaming.
    StopLiveRoomList,
    /// Popularity value from a heartbeat reply (synthesized).
    PopValueUpdate,
}

/// Table of `(event type, wire name, description)`, ordered by index.
const COMMAND_TABLE: [(EventType, &str, &str); EventType::COUNT] = [
    (EventType::DanmuMsg, "DANMU_MSG", "chat message"),
    (EventType::InteractWord, "INTERACT_WORD", "entry or follow"),
    (EventType::SendGift, "SEND_GIFT", "gift"),
    (EventType::GiftStarProcess, "GIFT_STAR_PROCESS", "gift star lit"),
    (EventType::ComboSend, "COMBO_SEND", "gift combo"),
    (EventType::NoticeMsg, "NOTICE_MSG", "notice"),
    (EventType::Preparing, "PREPARING", "streamer preparing"),
    (
        EventType::RoomRealTimeMessageUpdate,
        "ROOM_REAL_TIME_MESSAGE_UPDATE",
        "streamer info update",
    ),
    (
        EventType::OnlineRankCount,
        "ONLINE_RANK_COUNT",
        "high-energy viewer count",
    ),
    (EventType::OnlineRankTop3, "ONLINE_RANK_TOP3", "rank top three"),
    (EventType::LikeInfoV3Click, "LIKE_INFO_V3_CLICK", "like click"),
    (EventType::LikeInfoV3Update, "LIKE_INFO_V3_UPDATE", "like count"),
    (
        EventType::PopularityRedPocketStart,
        "POPULARITY_RED_POCKET_START",
        "red envelope announced",
    ),
    (
        EventType::PopularityRedPocketNew,
        "POPULARITY_RED_POCKET_NEW",
        "red envelope sent",
    ),
    (
        EventType::PopularityRedPocketWinnerList,
        "POPULARITY_RED_POCKET_WINNER_LIST",
        "red envelope winners",
    ),
    (EventType::WatchedChange, "WATCHED_CHANGE", "watched count"),
    (EventType::EntryEffect, "ENTRY_EFFECT", "entry effect"),
    (EventType::AreaRankChanged, "AREA_RANK_CHANGED", "area rank change"),
    (
        EventType::CommonNoticeDanmaku,
        "COMMON_NOTICE_DANMAKU",
        "area rank congratulation",
    ),
    (EventType::RoomChange, "ROOM_CHANGE", "room info change"),
    (
        EventType::SuperChatEntrance,
        "SUPER_CHAT_ENTRANCE",
        "super chat entrance",
    ),
    (EventType::WidgetBanner, "WIDGET_BANNER", "top banner"),
    (
        EventType::StopLiveRoomList,
        "STOP_LIVE_ROOM_LIST",
        "stopped rooms",
    ),
    (EventType::PopValueUpdate, "POP_VALUE_UPDATE", "popularity value"),
];

impl EventType {
    /// Number of event types; also the handler table size.
    pub const COUNT: usize = 24;

    /// All event types in table order.
    pub const ALL: [EventType; Self::COUNT] = [
        Self::DanmuMsg,
        Self::InteractWord,
        Self::SendGift,
        Self::GiftStarProcess,
        Self::ComboSend,
        Self::NoticeMsg,
        Self::Preparing,
        Self::RoomRealTimeMessageUpdate,
        Self::OnlineRankCount,
        Self::OnlineRankTop3,
        Self::LikeInfoV3Click,
        Self::LikeInfoV3Update,
        Self::PopularityRedPocketStart,
        Self::PopularityRedPocketNew,
        Self::PopularityRedPocketWinnerList,
        Self::WatchedChange,
        Self::EntryEffect,
        Self::AreaRankChanged,
        Self::CommonNoticeDanmaku,
        Self::RoomChange,
        Self::SuperChatEntrance,
        Self::WidgetBanner,
        Self::StopLiveRoomList,
        Self::PopValueUpdate,
    ];

    /// Returns the table index of this event type.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts a raw table index to an event type.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `index >= COUNT`.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            Error::invalid_argument(format!(
                "event type index {index} is out of range 0..{}",
                Self::COUNT
            ))
        })
    }

    /// Returns the wire command name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        COMMAND_TABLE[self as usize].1
    }

    /// Returns a short human description.
    #[inline]
    #[must_use]
    pub const fn description(self) -> &'static str {
        COMMAND_TABLE[self as usize].2
    }

    /// Looks up a wire command name by exact match.
    #[must_use]
    pub fn from_command(cmd: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(_, name, _)| *name == cmd)
            .map(|(event_type, _, _)| *event_type)
    }

    /// Returns `true` for events synthesized locally rather than pushed.
    #[inline]
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::PopValueUpdate)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
