//! Wire codec: messages as CBOR maps.
//!
//! Outbound maps are keyed by numeric key ids. Inbound keys are accepted in
//! any spelling the companion side has been seen to produce: the symbolic
//! name, the numeric id, or the id as a decimal string. This is the only
//! place where key spellings are reconciled.

use bytes::Bytes;
use ciborium::value::Value;

use checksync_core::DeviceIndex;

use crate::error::{DeviceError, Result};
use crate::messages::{limits, DeviceEvent, MessageKey, MessageKeys, OutboundMessage};

/// Encode a message for the device, enforcing the device inbox limit.
pub fn encode_message(message: &OutboundMessage, keys: &MessageKeys) -> Result<Bytes> {
    let key = |k: MessageKey| Value::Integer(keys.id(k).into());

    let entries = match message {
        OutboundMessage::ItemsCount(count) => {
            vec![(key(MessageKey::ItemsCount), Value::Integer((*count).into()))]
        }
        OutboundMessage::Item { index, name } => vec![
            (key(MessageKey::ItemsIndex), Value::Integer(index.0.into())),
            (key(MessageKey::ItemsItem), Value::Text(name.clone())),
        ],
        OutboundMessage::ListTitle(title) => {
            vec![(key(MessageKey::ListTitle), Value::Text(title.clone()))]
        }
        OutboundMessage::Status(text) => {
            vec![(key(MessageKey::SetStatus), Value::Text(text.clone()))]
        }
        OutboundMessage::Progressing(on) => vec![(
            key(MessageKey::SetProgressing),
            Value::Integer(u8::from(*on).into()),
        )],
    };

    encode_map(entries, limits::MAX_OUTBOUND_BYTES)
}

/// Decode an event sent by the device.
///
/// A payload carrying neither `ITEM_CHECKED` nor `ITEM_UNCHECKED` decodes to
/// [`DeviceEvent::Unknown`]; if both are present, `ITEM_CHECKED` wins.
pub fn decode_event(frame: &[u8], keys: &MessageKeys) -> Result<DeviceEvent> {
    let entries = decode_map(frame, limits::MAX_INBOUND_BYTES)?;

    let mut checked = None;
    let mut unchecked = None;
    for (key, value) in &entries {
        match resolve_key(key, keys) {
            Some(MessageKey::ItemChecked) => checked = Some(as_i64(value)?),
            Some(MessageKey::ItemUnchecked) => unchecked = Some(as_i64(value)?),
            _ => {}
        }
    }

    Ok(match (checked, unchecked) {
        (Some(index), _) => DeviceEvent::ItemChecked(index),
        (None, Some(index)) => DeviceEvent::ItemUnchecked(index),
        (None, None) => DeviceEvent::Unknown,
    })
}

/// Encode an event as the device would send it.
pub fn encode_event(event: &DeviceEvent, keys: &MessageKeys) -> Result<Bytes> {
    let key = |k: MessageKey| Value::Integer(keys.id(k).into());

    let entries = match *event {
        DeviceEvent::ItemChecked(index) => {
            vec![(key(MessageKey::ItemChecked), Value::Integer(index.into()))]
        }
        DeviceEvent::ItemUnchecked(index) => {
            vec![(key(MessageKey::ItemUnchecked), Value::Integer(index.into()))]
        }
        DeviceEvent::Unknown => Vec::new(),
    };

    encode_map(entries, limits::MAX_INBOUND_BYTES)
}

/// Decode a message as the device would read it.
pub fn decode_message(frame: &[u8], keys: &MessageKeys) -> Result<OutboundMessage> {
    let entries = decode_map(frame, limits::MAX_OUTBOUND_BYTES)?;
    let find = |wanted: MessageKey| {
        entries
            .iter()
            .find(|(key, _)| resolve_key(key, keys) == Some(wanted))
            .map(|(_, value)| value)
    };

    if let Some(count) = find(MessageKey::ItemsCount) {
        let count = u32::try_from(as_i64(count)?)
            .map_err(|_| DeviceError::Decode("count out of range".into()))?;
        return Ok(OutboundMessage::ItemsCount(count));
    }
    if let (Some(index), Some(name)) = (find(MessageKey::ItemsIndex), find(MessageKey::ItemsItem)) {
        let index = u32::try_from(as_i64(index)?)
            .map_err(|_| DeviceError::Decode("index out of range".into()))?;
        return Ok(OutboundMessage::Item {
            index: DeviceIndex(index),
            name: as_text(name)?,
        });
    }
    if let Some(title) = find(MessageKey::ListTitle) {
        return Ok(OutboundMessage::ListTitle(as_text(title)?));
    }
    if let Some(status) = find(MessageKey::SetStatus) {
        return Ok(OutboundMessage::Status(as_text(status)?));
    }
    if let Some(on) = find(MessageKey::SetProgressing) {
        return Ok(OutboundMessage::Progressing(as_i64(on)? != 0));
    }

    Err(DeviceError::Decode("no known message key".into()))
}

fn encode_map(entries: Vec<(Value, Value)>, limit: usize) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&Value::Map(entries), &mut buf)
        .map_err(|e| DeviceError::Encode(e.to_string()))?;

    if buf.len() > limit {
        return Err(DeviceError::PayloadTooLarge {
            size: buf.len(),
            limit,
        });
    }
    Ok(Bytes::from(buf))
}

fn decode_map(frame: &[u8], limit: usize) -> Result<Vec<(Value, Value)>> {
    if frame.len() > limit {
        return Err(DeviceError::PayloadTooLarge {
            size: frame.len(),
            limit,
        });
    }

    let value: Value =
        ciborium::de::from_reader(frame).map_err(|e| DeviceError::Decode(e.to_string()))?;
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(DeviceError::Decode("expected a map".into())),
    }
}

fn resolve_key(key: &Value, keys: &MessageKeys) -> Option<MessageKey> {
    match key {
        Value::Text(spelling) => keys.resolve(spelling),
        Value::Integer(id) => u32::try_from(i128::from(*id))
            .ok()
            .and_then(|id| keys.key_for_id(id)),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(*i))
            .map_err(|_| DeviceError::Decode("integer out of range".into())),
        Value::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| DeviceError::Decode(format!("not an integer: {text:?}"))),
        _ => Err(DeviceError::Decode("expected an integer".into())),
    }
}

fn as_text(value: &Value) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        _ => Err(DeviceError::Decode("expected text".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_map(entries: Vec<(Value, Value)>) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_count_uses_numeric_key() {
        let keys = MessageKeys::default();
        let frame = encode_message(&OutboundMessage::ItemsCount(2), &keys).unwrap();

        let entries = match ciborium::de::from_reader::<Value, _>(&frame[..]).unwrap() {
            Value::Map(entries) => entries,
            other => panic!("expected map, got {other:?}"),
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Value::Integer(10000u32.into()));
        assert_eq!(entries[0].1, Value::Integer(2u32.into()));
    }

    #[test]
    fn test_item_message_readable_by_device() {
        let keys = MessageKeys::default();
        let msg = OutboundMessage::item(DeviceIndex(1), "Call Bob");
        let frame = encode_message(&msg, &keys).unwrap();
        assert_eq!(decode_message(&frame, &keys).unwrap(), msg);
    }

    #[test]
    fn test_decode_event_by_name() {
        let keys = MessageKeys::default();
        let frame = raw_map(vec![(
            Value::Text("ITEM_CHECKED".into()),
            Value::Integer(1u32.into()),
        )]);
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::ItemChecked(1));
    }

    #[test]
    fn test_decode_event_by_numeric_id() {
        let keys = MessageKeys::default();
        let frame = raw_map(vec![(
            Value::Integer(10004u32.into()),
            Value::Integer(0u32.into()),
        )]);
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::ItemUnchecked(0));
    }

    #[test]
    fn test_decode_event_by_decimal_string_id() {
        let keys = MessageKeys::default();
        let frame = raw_map(vec![(
            Value::Text("10003".into()),
            Value::Text("3".into()),
        )]);
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::ItemChecked(3));
    }

    #[test]
    fn test_decode_event_negative_index_is_preserved() {
        let keys = MessageKeys::default();
        let frame = encode_event(&DeviceEvent::ItemChecked(-1), &keys).unwrap();
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::ItemChecked(-1));
    }

    #[test]
    fn test_decode_event_unknown_payload() {
        let keys = MessageKeys::default();
        let frame = raw_map(vec![(
            Value::Text("SOMETHING_ELSE".into()),
            Value::Integer(1u32.into()),
        )]);
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::Unknown);
    }

    #[test]
    fn test_decode_event_rejects_garbage() {
        let keys = MessageKeys::default();
        assert!(matches!(
            decode_event(&[0xff, 0x00, 0x13], &keys),
            Err(DeviceError::Decode(_))
        ));

        let not_a_map = {
            let mut buf = Vec::new();
            ciborium::ser::into_writer(&Value::Integer(5u32.into()), &mut buf).unwrap();
            buf
        };
        assert!(matches!(
            decode_event(&not_a_map, &keys),
            Err(DeviceError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_event_enforces_outbox_limit() {
        let keys = MessageKeys::default();
        let frame = vec![0u8; limits::MAX_INBOUND_BYTES + 1];
        assert!(matches!(
            decode_event(&frame, &keys),
            Err(DeviceError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_enforces_inbox_limit() {
        let keys = MessageKeys::default();
        // Bypass the truncating constructor.
        let msg = OutboundMessage::Item {
            index: DeviceIndex(0),
            name: "x".repeat(limits::MAX_OUTBOUND_BYTES),
        };
        assert!(matches!(
            encode_message(&msg, &keys),
            Err(DeviceError::PayloadTooLarge { limit: 1024, .. })
        ));
    }

    #[test]
    fn test_longest_truncated_item_fits() {
        let keys = MessageKeys::default();
        let name = "é".repeat(limits::MAX_ITEM_NAME_BYTES);
        let msg = OutboundMessage::item(DeviceIndex(u32::MAX), &name);
        assert!(encode_message(&msg, &keys).is_ok());
    }

    #[test]
    fn test_progressing_is_integer_flag() {
        let keys = MessageKeys::default();
        let frame = encode_message(&OutboundMessage::Progressing(true), &keys).unwrap();
        assert_eq!(
            decode_message(&frame, &keys).unwrap(),
            OutboundMessage::Progressing(true)
        );
    }

    #[test]
    fn test_custom_key_ids() {
        let keys = MessageKeys::with_base(1);
        let frame = encode_event(&DeviceEvent::ItemChecked(4), &keys).unwrap();
        assert_eq!(decode_event(&frame, &keys).unwrap(), DeviceEvent::ItemChecked(4));
        // The same frame means something else under the default ids.
        assert_eq!(
            decode_event(&frame, &MessageKeys::default()).unwrap(),
            DeviceEvent::Unknown
        );
    }

    proptest! {
        #[test]
        fn test_decode_event_never_panics(frame in prop::collection::vec(any::<u8>(), 0..96)) {
            let _ = decode_event(&frame, &MessageKeys::default());
        }
    }
}
