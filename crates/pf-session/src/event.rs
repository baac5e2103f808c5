//! Game Events — normalized feedback triggers
//!
//! Wire commands carry more than the feedback loop cares about. The
//! translator reduces them to the four events that can start a pattern,
//! tracking the item-log position so replayed grants never retrigger.

use crate::protocol::{ItemCategory, SessionMessage, LINK_TAG};

/// A session happening the dispatcher reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Handshake completed; counters are the authoritative session snapshot
    ConnectionEstablished { checked: u64, missing: u64 },
    /// One item was granted to this slot
    ItemReceived { category: ItemCategory },
    /// One or more locations were newly checked
    LocationChecked { count: u64 },
    /// A cross-player link signal bounced through the session
    LinkSignal {
        timestamp: Option<f64>,
        source: Option<String>,
    },
}

/// Stateful wire-to-event translation
///
/// The server may resend the full item log (index 0) after a reconnect;
/// `items_seen` makes replays idempotent.
#[derive(Debug, Default)]
pub struct EventTranslator {
    items_seen: usize,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one wire command into zero or more game events
    pub fn translate(&mut self, message: SessionMessage) -> Vec<GameEvent> {
        match message {
            SessionMessage::Connected {
                checked_locations,
                missing_locations,
            } => {
                // Fresh session: the item log restarts from index 0
                self.items_seen = 0;
                vec![GameEvent::ConnectionEstablished {
                    checked: checked_locations.len() as u64,
                    missing: missing_locations.len() as u64,
                }]
            }

            SessionMessage::ReceivedItems { index, items } => {
                let index = index as usize;
                if index == self.items_seen {
                    self.items_seen += items.len();
                    items
                        .iter()
                        .map(|item| GameEvent::ItemReceived {
                            category: ItemCategory::from_flags(item.flags),
                        })
                        .collect()
                } else if index == 0 {
                    // Full resync; only the tail past our position is new
                    let new_items = items.get(self.items_seen..).unwrap_or_default();
                    self.items_seen = items.len().max(self.items_seen);
                    new_items
                        .iter()
                        .map(|item| GameEvent::ItemReceived {
                            category: ItemCategory::from_flags(item.flags),
                        })
                        .collect()
                } else {
                    log::warn!(
                        "[Session] Out-of-order ReceivedItems: index {index}, expected {}",
                        self.items_seen
                    );
                    Vec::new()
                }
            }

            SessionMessage::RoomUpdate { checked_locations } => match checked_locations {
                Some(locations) if !locations.is_empty() => {
                    vec![GameEvent::LocationChecked {
                        count: locations.len() as u64,
                    }]
                }
                _ => Vec::new(),
            },

            SessionMessage::Bounced { tags, data } => {
                if !tags.iter().any(|t| t == LINK_TAG) {
                    return Vec::new();
                }
                vec![GameEvent::LinkSignal {
                    timestamp: data.get("time").and_then(|v| v.as_f64()),
                    source: data
                        .get("source")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                }]
            }

            SessionMessage::Unknown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NetworkItem;
    use serde_json::json;

    fn item(flags: u32) -> NetworkItem {
        NetworkItem {
            item: 1,
            location: 2,
            player: 3,
            flags,
        }
    }

    #[test]
    fn test_connected_snapshot() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::Connected {
            checked_locations: vec![1, 2],
            missing_locations: vec![3, 4, 5],
        });
        assert_eq!(
            events,
            vec![GameEvent::ConnectionEstablished {
                checked: 2,
                missing: 3,
            }]
        );
    }

    #[test]
    fn test_items_translate_in_order() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::ReceivedItems {
            index: 0,
            items: vec![item(0b001), item(0b100), item(0)],
        });
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            GameEvent::ItemReceived {
                category: ItemCategory::Progression,
            }
        );
        assert_eq!(
            events[1],
            GameEvent::ItemReceived {
                category: ItemCategory::Trap,
            }
        );
        assert_eq!(
            events[2],
            GameEvent::ItemReceived {
                category: ItemCategory::Trash,
            }
        );
    }

    #[test]
    fn test_resync_only_emits_unseen_tail() {
        let mut translator = EventTranslator::new();
        translator.translate(SessionMessage::ReceivedItems {
            index: 0,
            items: vec![item(0b001), item(0b010)],
        });
        // Reconnect-style full replay with one genuinely new item
        let events = translator.translate(SessionMessage::ReceivedItems {
            index: 0,
            items: vec![item(0b001), item(0b010), item(0b100)],
        });
        assert_eq!(
            events,
            vec![GameEvent::ItemReceived {
                category: ItemCategory::Trap,
            }]
        );
    }

    #[test]
    fn test_out_of_order_items_dropped() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::ReceivedItems {
            index: 5,
            items: vec![item(0b001)],
        });
        assert!(events.is_empty());
    }

    #[test]
    fn test_connected_resets_item_position() {
        let mut translator = EventTranslator::new();
        translator.translate(SessionMessage::ReceivedItems {
            index: 0,
            items: vec![item(0)],
        });
        translator.translate(SessionMessage::Connected {
            checked_locations: vec![],
            missing_locations: vec![],
        });
        let events = translator.translate(SessionMessage::ReceivedItems {
            index: 0,
            items: vec![item(0)],
        });
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_room_update_counts_checks() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::RoomUpdate {
            checked_locations: Some(vec![10, 11, 12]),
        });
        assert_eq!(events, vec![GameEvent::LocationChecked { count: 3 }]);

        assert!(
            translator
                .translate(SessionMessage::RoomUpdate {
                    checked_locations: Some(vec![]),
                })
                .is_empty()
        );
        assert!(
            translator
                .translate(SessionMessage::RoomUpdate {
                    checked_locations: None,
                })
                .is_empty()
        );
    }

    #[test]
    fn test_bounced_link_signal() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::Bounced {
            tags: vec!["Link".to_string()],
            data: json!({"time": 1234.5, "source": "Player2"}),
        });
        assert_eq!(
            events,
            vec![GameEvent::LinkSignal {
                timestamp: Some(1234.5),
                source: Some("Player2".to_string()),
            }]
        );
    }

    #[test]
    fn test_untagged_bounce_ignored() {
        let mut translator = EventTranslator::new();
        let events = translator.translate(SessionMessage::Bounced {
            tags: vec!["ChatRelay".to_string()],
            data: json!({"time": 1.0}),
        });
        assert!(events.is_empty());
    }
}
