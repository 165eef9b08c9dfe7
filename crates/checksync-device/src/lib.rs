//! # Checksync Device
//!
//! Messaging with the companion display device.
//!
//! ## Overview
//!
//! The device has tiny message buffers, no bulk transfer, and a channel that
//! accepts one message at a time and reports each one as delivered or failed.
//! A checklist therefore goes over as a count followed by one message per
//! item, each acknowledged before the next is sent.
//!
//! ## Layers
//!
//! - [`messages`] - Logical messages, events, and dictionary key ids
//! - [`codec`] - CBOR encoding with the device buffer limits
//! - [`channel`] - [`DeviceChannel`] plus a framed adapter and an in-memory link
//! - [`delivery`] - The acknowledged delivery state machine and retry policy
//!
//! ## Message Flow
//!
//! ```text
//! Companion                           Device
//!   |-------- ITEMS_COUNT: n -------->|
//!   |<------- ack --------------------|
//!   |-------- ITEMS_INDEX 0, ITEM --->|
//!   |<------- fail -------------------|
//!   |-------- ITEMS_INDEX 0, ITEM --->|   (same payload, after a delay)
//!   |<------- ack --------------------|
//!   |            ...                  |
//!   |<------- ITEM_CHECKED: i --------|
//! ```

pub mod channel;
pub mod codec;
pub mod delivery;
pub mod error;
pub mod messages;

pub use channel::{
    memory::{self, IncomingFrame, MemoryDevice, MemoryLink},
    DeviceChannel, FrameLink, FramedChannel,
};
pub use codec::{decode_event, decode_message, encode_event, encode_message};
pub use delivery::{Delivery, DeliveryReport, DeliveryState, FixedDelay, RetryPolicy, Stage};
pub use error::{DeviceError, Result};
pub use messages::{limits, DeviceEvent, MessageKey, MessageKeys, OutboundMessage};
