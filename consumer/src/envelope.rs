//! Locates the request record inside a delivered payload.
//!
//! Accepted shapes, possibly nested into each other:
//! - the record object itself
//! - a stream entry as a flat field/value list: `["data", "<record json>"]`
//! - an event object whose `data` member holds one of the above
//! - a JSON string containing one of the above

use serde_json::{Map, Value};
use shared::record::{DecodingError, RECORD_FIELD, RequestRecord};

const MAX_DEPTH: usize = 4;

pub fn extract_record(payload: &[u8]) -> Result<RequestRecord, DecodingError> {
    let value: Value = serde_json::from_slice(payload)?;
    locate(value, 0)
}

fn locate(value: Value, depth: usize) -> Result<RequestRecord, DecodingError> {
    if depth > MAX_DEPTH {
        return Err(DecodingError::MissingRecord);
    }

    match value {
        Value::Object(map) if looks_like_record(&map) => {
            RequestRecord::decode_value(Value::Object(map))
        }
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => locate(data, depth + 1),
            None => Err(DecodingError::MissingRecord),
        },
        Value::Array(items) => {
            let mut items = items.into_iter();
            while let (Some(field), Some(value)) = (items.next(), items.next()) {
                if field.as_str() == Some(RECORD_FIELD) {
                    return locate(value, depth + 1);
                }
            }
            Err(DecodingError::MissingRecord)
        }
        Value::String(s) => {
            let inner: Value = serde_json::from_str(&s)?;
            locate(inner, depth + 1)
        }
        _ => Err(DecodingError::MissingRecord),
    }
}

fn looks_like_record(map: &Map<String, Value>) -> bool {
    map.contains_key("url") || map.contains_key("method")
}
