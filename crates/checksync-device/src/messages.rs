//! Device message types.
//!
//! Messages are small key/value dictionaries. The device addresses entries by
//! numeric key ids assigned at build time, so the same logical key can show
//! up as its name or as its id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use checksync_core::DeviceIndex;

/// Device buffer limits.
pub mod limits {
    /// Size of the device inbox, in encoded bytes.
    pub const MAX_OUTBOUND_BYTES: usize = 1024;
    /// Size of the device outbox, in encoded bytes.
    pub const MAX_INBOUND_BYTES: usize = 64;
    /// Longest item name handed to the device.
    pub const MAX_ITEM_NAME_BYTES: usize = 256;
    /// Title buffer on the device, minus the terminator.
    pub const MAX_TITLE_BYTES: usize = 63;
    /// Status text buffer on the device, minus the terminator.
    pub const MAX_STATUS_BYTES: usize = 31;
}

/// Default id of the first message key.
pub const DEFAULT_KEY_BASE: u32 = 10000;

/// Logical dictionary keys understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKey {
    ItemsCount,
    ItemsIndex,
    ItemsItem,
    ItemChecked,
    ItemUnchecked,
    ListTitle,
    SetStatus,
    SetProgressing,
}

impl MessageKey {
    /// All keys, in declaration order.
    pub const ALL: [MessageKey; 8] = [
        MessageKey::ItemsCount,
        MessageKey::ItemsIndex,
        MessageKey::ItemsItem,
        MessageKey::ItemChecked,
        MessageKey::ItemUnchecked,
        MessageKey::ListTitle,
        MessageKey::SetStatus,
        MessageKey::SetProgressing,
    ];

    /// Symbolic name of the key.
    pub const fn name(self) -> &'static str {
        match self {
            MessageKey::ItemsCount => "ITEMS_COUNT",
            MessageKey::ItemsIndex => "ITEMS_INDEX",
            MessageKey::ItemsItem => "ITEMS_ITEM",
            MessageKey::ItemChecked => "ITEM_CHECKED",
            MessageKey::ItemUnchecked => "ITEM_UNCHECKED",
            MessageKey::ListTitle => "LIST_TITLE",
            MessageKey::SetStatus => "SET_STATUS",
            MessageKey::SetProgressing => "SET_PROGRESSING",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Mapping from logical keys to numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKeys {
    ids: BTreeMap<MessageKey, u32>,
}

impl MessageKeys {
    /// Assign consecutive ids starting at `base`, in declaration order.
    pub fn with_base(base: u32) -> Self {
        let ids = MessageKey::ALL
            .into_iter()
            .zip(base..)
            .collect();
        Self { ids }
    }

    /// Override the id of one key.
    pub fn with_id(mut self, key: MessageKey, id: u32) -> Self {
        self.ids.insert(key, id);
        self
    }

    /// Numeric id of `key`. Keys missing from the map keep their default id.
    pub fn id(&self, key: MessageKey) -> u32 {
        self.ids
            .get(&key)
            .copied()
            .unwrap_or(DEFAULT_KEY_BASE + key as u32)
    }

    /// Key with the given numeric id.
    pub fn key_for_id(&self, id: u32) -> Option<MessageKey> {
        MessageKey::ALL.into_iter().find(|key| self.id(*key) == id)
    }

    /// Resolve a textual spelling: the symbolic name or a decimal id.
    pub fn resolve(&self, spelling: &str) -> Option<MessageKey> {
        MessageKey::from_name(spelling)
            .or_else(|| spelling.parse::<u32>().ok().and_then(|id| self.key_for_id(id)))
    }
}

impl Default for MessageKeys {
    fn default() -> Self {
        Self::with_base(DEFAULT_KEY_BASE)
    }
}

/// Messages sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Number of items that follow. Resets the device list.
    ItemsCount(u32),
    /// One item of the list.
    Item { index: DeviceIndex, name: String },
    /// Heading shown above the list.
    ListTitle(String),
    /// Short status line.
    Status(String),
    /// Busy indicator.
    Progressing(bool),
}

impl OutboundMessage {
    /// Build an item message, truncating the name to the device capacity.
    pub fn item(index: DeviceIndex, name: &str) -> Self {
        OutboundMessage::Item {
            index,
            name: truncate_to_boundary(name, limits::MAX_ITEM_NAME_BYTES).to_owned(),
        }
    }

    pub fn title(title: &str) -> Self {
        OutboundMessage::ListTitle(truncate_to_boundary(title, limits::MAX_TITLE_BYTES).to_owned())
    }

    pub fn status(text: &str) -> Self {
        OutboundMessage::Status(truncate_to_boundary(text, limits::MAX_STATUS_BYTES).to_owned())
    }

    /// Whether this is a best-effort notice rather than list data.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            OutboundMessage::ListTitle(_) | OutboundMessage::Status(_) | OutboundMessage::Progressing(_)
        )
    }
}

/// Events sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The user marked the item at this index done.
    ItemChecked(i64),
    /// The user marked the item at this index not done.
    ItemUnchecked(i64),
    /// A payload carrying neither key.
    Unknown,
}

impl DeviceEvent {
    /// The raw index and requested state, for toggle events.
    pub fn toggle(&self) -> Option<(i64, bool)> {
        match *self {
            DeviceEvent::ItemChecked(index) => Some((index, true)),
            DeviceEvent::ItemUnchecked(index) => Some((index, false)),
            DeviceEvent::Unknown => None,
        }
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
pub fn truncate_to_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
