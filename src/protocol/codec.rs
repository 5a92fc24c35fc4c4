//! Frame payload decoding.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{StreamMessage, ToolCallRecord};

/// A frame payload that could not be turned into a [`StreamMessage`].
///
/// Never fatal to a session: the controller reports it as a warning and
/// keeps reading.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("frame matches no known message (keys: {keys:?})")]
    UnrecognizedShape { keys: Vec<String> },
}

/// Decode one frame payload.
///
/// Classification checks fields in the order `error` > `done` > `tool_call`
/// > `chunk`, so a payload carrying a terminal marker is never absorbed as
/// content.
pub fn decode(payload: &str) -> Result<StreamMessage, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    if let Some(error) = present(&fields, "error") {
        let message = match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Ok(StreamMessage::Failure { message });
    }

    if matches!(fields.get("done"), Some(Value::Bool(true))) {
        return Ok(StreamMessage::Done);
    }

    if let Some(call) = present(&fields, "tool_call") {
        let Value::Object(call) = call else {
            return Err(DecodeError::InvalidField {
                field: "tool_call",
                expected: "an object",
            });
        };
        return Ok(StreamMessage::ToolCall(tool_call_record(call)));
    }

    if let Some(chunk) = present(&fields, "chunk") {
        let Value::String(text) = chunk else {
            return Err(DecodeError::InvalidField {
                field: "chunk",
                expected: "a string",
            });
        };
        return Ok(StreamMessage::Chunk { text: text.clone() });
    }

    Err(DecodeError::UnrecognizedShape {
        keys: fields.keys().cloned().collect(),
    })
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|value| !value.is_null())
}

fn tool_call_record(call: &Map<String, Value>) -> ToolCallRecord {
    let name = string_field(call.get("name"));
    let input = call.get("input").cloned().unwrap_or(Value::Null);
    // `input.action` wins over a top-level `action`.
    let action = input
        .get("action")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| string_field(call.get("action")));

    ToolCallRecord {
        name,
        action,
        input,
    }
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
