//! Decoding of raw stream replies.
//!
//! Replies are parsed from [`Value`] directly so the adapter works against
//! both RESP2 arrays and RESP3 maps.

use bb8_redis::redis::{RedisError, Value};

use crate::domain::StreamFields;
use crate::domain::ports::{
    AdmissionGateError, CacheStoreError, FulfillmentQueueError, StreamMessage,
};

/// Server error code returned when a consumer group already exists.
pub(super) const BUSY_GROUP: &str = "BUSYGROUP";
/// Server error code returned when the consumer group or stream is missing.
pub(super) const NO_GROUP: &str = "NOGROUP";

/// Whether a command failed because the server was unreachable.
pub(super) fn is_connection_error(error: &RedisError) -> bool {
    error.is_io_error() || error.is_connection_dropped() || error.is_timeout()
}

pub(super) fn cache_error(error: RedisError) -> CacheStoreError {
    if is_connection_error(&error) {
        CacheStoreError::connection(error.to_string())
    } else {
        CacheStoreError::command(error.to_string())
    }
}

pub(super) fn gate_error(error: RedisError) -> AdmissionGateError {
    if is_connection_error(&error) {
        AdmissionGateError::unavailable(error.to_string())
    } else {
        AdmissionGateError::script(error.to_string())
    }
}

pub(super) fn queue_error(error: RedisError, group: &str) -> FulfillmentQueueError {
    if error.code() == Some(NO_GROUP) {
        FulfillmentQueueError::no_group(group)
    } else if is_connection_error(&error) {
        FulfillmentQueueError::connection(error.to_string())
    } else {
        FulfillmentQueueError::command(error.to_string())
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::SimpleString(text) => Some(text.clone()),
        Value::Int(number) => Some(number.to_string()),
        _ => None,
    }
}

fn malformed(what: &str) -> FulfillmentQueueError {
    FulfillmentQueueError::command(format!("unexpected {what} reply shape"))
}

fn items(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Decode a flat `field value field value ...` list.
fn fields(value: &Value) -> Result<StreamFields, FulfillmentQueueError> {
    match value {
        Value::Array(items) => items
            .chunks(2)
            .map(|pair| match pair {
                [field, value] => text(field)
                    .zip(text(value))
                    .ok_or_else(|| malformed("stream field")),
                _ => Err(malformed("stream field")),
            })
            .collect(),
        Value::Map(pairs) => pairs
            .iter()
            .map(|(field, value)| {
                text(field)
                    .zip(text(value))
                    .ok_or_else(|| malformed("stream field"))
            })
            .collect(),
        _ => Err(malformed("stream field")),
    }
}

/// Decode a list of `[id, [fields...]]` entries. Nil entries (deleted
/// before a claim) are skipped.
pub(super) fn entries(value: &Value) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
    let Some(list) = items(value) else {
        return match value {
            Value::Nil => Ok(Vec::new()),
            _ => Err(malformed("stream entry list")),
        };
    };
    list.iter()
        .filter(|entry| !matches!(entry, Value::Nil))
        .map(|entry| match items(entry) {
            Some([id, body]) => Ok(StreamMessage {
                id: text(id).ok_or_else(|| malformed("stream id"))?,
                fields: match body {
                    Value::Nil => StreamFields::new(),
                    other => fields(other)?,
                },
            }),
            _ => Err(malformed("stream entry")),
        })
        .collect()
}

/// Decode an `XREADGROUP` reply for a single stream. Nil means the block
/// timed out.
pub(super) fn read_group(value: &Value) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Array(streams) => streams.iter().try_fold(Vec::new(), |mut acc, stream| {
            match items(stream) {
                Some([_name, body]) => acc.extend(entries(body)?),
                _ => return Err(malformed("XREADGROUP stream")),
            }
            Ok(acc)
        }),
        Value::Map(streams) => streams
            .iter()
            .try_fold(Vec::new(), |mut acc, (_name, body)| {
                acc.extend(entries(body)?);
                Ok(acc)
            }),
        _ => Err(malformed("XREADGROUP")),
    }
}

/// Decode an `XAUTOCLAIM` reply: `[next_cursor, entries, deleted_ids?]`.
pub(super) fn auto_claim(value: &Value) -> Result<Vec<StreamMessage>, FulfillmentQueueError> {
    match items(value) {
        Some([_cursor, claimed, ..]) => entries(claimed),
        _ => Err(malformed("XAUTOCLAIM")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bulk(text: &str) -> Value {
        Value::BulkString(text.as_bytes().to_vec())
    }

    fn entry(id: &str, pairs: &[(&str, &str)]) -> Value {
        Value::Array(vec![
            bulk(id),
            Value::Array(
                pairs
                    .iter()
                    .flat_map(|(field, value)| [bulk(field), bulk(value)])
                    .collect(),
            ),
        ])
    }

    #[rstest]
    fn read_group_decodes_resp2_arrays() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("stream:orders"),
            Value::Array(vec![
                entry("1-0", &[("order_id", "7"), ("retry_count", "0")]),
                entry("1-1", &[("order_id", "8")]),
            ]),
        ])]);

        let messages = read_group(&reply).expect("decodes");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "1-0");
        assert_eq!(
            messages[0].fields.get("retry_count").map(String::as_str),
            Some("0")
        );
    }

    #[rstest]
    fn read_group_decodes_resp3_maps() {
        let reply = Value::Map(vec![(
            bulk("stream:orders"),
            Value::Array(vec![entry("2-0", &[("order_id", "9")])]),
        )]);
        assert_eq!(read_group(&reply).expect("decodes").len(), 1);
    }

    #[rstest]
    fn nil_read_is_a_timeout() {
        assert_eq!(read_group(&Value::Nil), Ok(Vec::new()));
    }

    #[rstest]
    fn auto_claim_skips_deleted_entries() {
        let reply = Value::Array(vec![
            bulk("0-0"),
            Value::Array(vec![entry("3-0", &[("order_id", "1")]), Value::Nil]),
            Value::Array(vec![]),
        ]);
        let messages = auto_claim(&reply).expect("decodes");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "3-0");
    }

    #[rstest]
    #[case(Value::Int(3))]
    #[case(Value::Array(vec![Value::Array(vec![bulk("only-name")])]))]
    fn unexpected_shapes_are_command_errors(#[case] reply: Value) {
        assert!(matches!(
            read_group(&reply),
            Err(FulfillmentQueueError::Command { .. })
        ));
    }
}
