//! Session Wire Protocol — JSON commands over the session WebSocket
//!
//! The server sends JSON arrays of command objects; each object carries a
//! `cmd` discriminator. Only the commands the feedback loop reacts to are
//! modeled here; everything else deserializes to `Unknown` and is dropped.

use pf_pattern::PatternSlot;
use serde::Deserialize;
use serde_json::json;

/// Bounce tag that marks cross-player link signals
pub const LINK_TAG: &str = "Link";

/// `items_handling` bitmask: receive own items, others' items and starting inventory
const ITEMS_HANDLING_ALL: u8 = 0b111;

/// One item grant inside a `ReceivedItems` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkItem {
    pub item: i64,
    pub location: i64,
    pub player: i64,
    #[serde(default)]
    pub flags: u32,
}

/// Gameplay classification of a granted item, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Progression,
    Useful,
    Trap,
    Trash,
}

impl ItemCategory {
    /// Bit 0 marks progression, bit 1 useful, bit 2 traps; anything
    /// unflagged is trash. Progression wins when multiple bits are set.
    pub fn from_flags(flags: u32) -> Self {
        if flags & 0b001 != 0 {
            ItemCategory::Progression
        } else if flags & 0b010 != 0 {
            ItemCategory::Useful
        } else if flags & 0b100 != 0 {
            ItemCategory::Trap
        } else {
            ItemCategory::Trash
        }
    }

    /// The pattern slot this category triggers
    pub fn slot(self) -> PatternSlot {
        match self {
            ItemCategory::Progression => PatternSlot::Progression,
            ItemCategory::Useful => PatternSlot::Useful,
            ItemCategory::Trap => PatternSlot::Trap,
            ItemCategory::Trash => PatternSlot::Trash,
        }
    }
}

/// Server-to-client commands the client reacts to
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd")]
pub enum SessionMessage {
    /// Handshake accepted; carries the authoritative location counters
    Connected {
        #[serde(default)]
        checked_locations: Vec<i64>,
        #[serde(default)]
        missing_locations: Vec<i64>,
    },

    /// Item grants starting at `index` in the session's item log
    ReceivedItems { index: u64, items: Vec<NetworkItem> },

    /// Incremental session state; only newly checked locations matter here
    RoomUpdate {
        #[serde(default)]
        checked_locations: Option<Vec<i64>>,
    },

    /// Relayed broadcast; link signals arrive tagged with [`LINK_TAG`]
    Bounced {
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        data: serde_json::Value,
    },

    /// Any command this client does not react to
    #[serde(other)]
    Unknown,
}

/// Parse one WebSocket text frame. The server normally sends an array of
/// commands; a bare object is accepted for tolerance.
pub fn parse_frame(text: &str) -> Result<Vec<SessionMessage>, serde_json::Error> {
    match serde_json::from_str::<Vec<SessionMessage>>(text) {
        Ok(messages) => Ok(messages),
        Err(_) => serde_json::from_str::<SessionMessage>(text).map(|m| vec![m]),
    }
}

/// Build the `Connect` handshake frame for `slot_name`
pub fn connect_frame(slot_name: &str, password: Option<&str>) -> String {
    json!([{
        "cmd": "Connect",
        "game": "",
        "name": slot_name,
        "password": password,
        "uuid": uuid::Uuid::new_v4().to_string(),
        "version": {"major": 0, "minor": 5, "build": 1, "class": "Version"},
        "items_handling": ITEMS_HANDLING_ALL,
        "tags": [LINK_TAG, "TextOnly"],
        "slot_data": false,
    }])
    .to_string()
}
