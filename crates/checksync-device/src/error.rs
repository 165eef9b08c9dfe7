//! Error types for the device module.

use thiserror::Error;

use crate::delivery::Stage;

/// Errors that can occur while talking to the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device or its link reported the message as not delivered.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The link to the device is closed for good.
    #[error("device disconnected")]
    Disconnected,

    /// Encoded message does not fit the receiving buffer.
    #[error("payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Message could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// Inbound payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The retry policy gave up on a message.
    #[error("delivery abandoned at {stage} after {failures} failures: {last}")]
    GaveUp {
        stage: Stage,
        failures: u32,
        last: Box<DeviceError>,
    },
}

impl DeviceError {
    /// Whether resending the same message can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Rejected(_))
    }
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
