//! JSON message codec.
//!
//! Wire format: one JSON object per write, keyed by `type`:
//! ```text
//! {"type":"command","id":"BIL-A1B2C3_7","timestamp":81234,"battery":3.91,
//!  "command":"start_recording","data":"wake_word"}
//! ```
//!
//! | type         | kind-specific fields                          |
//! |--------------|-----------------------------------------------|
//! | `command`    | `command` (required), `data`                  |
//! | `status`     | `status` (required), `data`                   |
//! | `audio_data` | `data` (required, lowercase hex)              |
//! | `heartbeat`  | `uptime`, `free_heap`                         |
//! | `error`      | `error_code` (required), `description`        |
//! | `ack`        | `ack_id` (required)                           |
//!
//! Decoding is strict: a missing required field, a field of the wrong JSON
//! type, or an unrecognized `type`/`command`/`status` rejects the whole
//! record.  Unknown extra keys are ignored.  `id`, `timestamp` and
//! `battery` are optional on inbound records.

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Value};

use super::message::{Command, ErrorCode, Message, MessageBody, MessageKind, Status};
use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a message into its wire bytes.
pub fn encode(msg: &Message) -> Vec<u8> {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::from(msg.kind().as_str()));
    obj.insert("id".into(), Value::from(msg.id.as_str()));
    obj.insert("timestamp".into(), Value::from(msg.timestamp));
    if let Some(volts) = msg.battery.and_then(|v| serde_json::Number::from_f64(f64::from(v))) {
        obj.insert("battery".into(), Value::Number(volts));
    }

    match &msg.body {
        MessageBody::Command { command, data } => {
            obj.insert("command".into(), Value::from(command.as_str()));
            insert_optional(&mut obj, "data", data);
        }
        MessageBody::Status { status, data } => {
            obj.insert("status".into(), Value::from(status.as_str()));
            insert_optional(&mut obj, "data", data);
        }
        MessageBody::AudioData { data } => {
            obj.insert("data".into(), Value::from(hex::encode(data)));
        }
        MessageBody::Heartbeat {
            uptime_ms,
            free_heap,
        } => {
            obj.insert("uptime".into(), Value::from(*uptime_ms));
            obj.insert("free_heap".into(), Value::from(*free_heap));
        }
        MessageBody::Error { code, description } => {
            obj.insert("error_code".into(), Value::from(code.code()));
            let description = if description.is_empty() {
                code.default_description()
            } else {
                description.as_str()
            };
            obj.insert("description".into(), Value::from(description));
        }
        MessageBody::Ack { ack_id } => {
            obj.insert("ack_id".into(), Value::from(ack_id.as_str()));
        }
    }

    Value::Object(obj).to_string().into_bytes()
}

/// Empty optional strings are omitted rather than sent as `""`.
fn insert_optional(obj: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        obj.insert(key.into(), Value::from(value));
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode wire bytes into a message.  Never yields a partial result.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| DecodeError::Malformed)?;
    let Value::Object(obj) = value else {
        return Err(DecodeError::Malformed);
    };

    let kind = match obj.get("type") {
        None => return Err(DecodeError::MissingField("type")),
        Some(Value::String(s)) => MessageKind::from_wire(s).ok_or(DecodeError::UnknownKind)?,
        Some(_) => return Err(DecodeError::InvalidField("type")),
    };

    let id = optional_str(&obj, "id")?.unwrap_or_default();
    let timestamp = optional_u64(&obj, "timestamp")?.unwrap_or(0);
    let battery = match obj.get("battery") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_f64().ok_or(DecodeError::InvalidField("battery"))? as f32),
    };

    let body = match kind {
        MessageKind::Command => {
            let name = required_str(&obj, "command")?;
            let command = Command::from_wire(&name).ok_or(DecodeError::UnknownCommand)?;
            let data = optional_str(&obj, "data")?.unwrap_or_default();
            MessageBody::Command { command, data }
        }
        MessageKind::Status => {
            let name = required_str(&obj, "status")?;
            let status = Status::from_wire(&name).ok_or(DecodeError::UnknownStatus)?;
            let data = optional_str(&obj, "data")?.unwrap_or_default();
            MessageBody::Status { status, data }
        }
        MessageKind::AudioData => {
            let encoded = required_str(&obj, "data")?;
            let data = hex::decode(encoded).map_err(|_| DecodeError::InvalidField("data"))?;
            MessageBody::AudioData { data }
        }
        MessageKind::Heartbeat => {
            // Host heartbeats carry no gauges.
            let uptime_ms = optional_u64(&obj, "uptime")?.unwrap_or(0);
            let free_heap = match optional_u64(&obj, "free_heap")? {
                Some(v) => u32::try_from(v).map_err(|_| DecodeError::InvalidField("free_heap"))?,
                None => 0,
            };
            MessageBody::Heartbeat {
                uptime_ms,
                free_heap,
            }
        }
        MessageKind::Error => {
            let raw = optional_u64(&obj, "error_code")?
                .ok_or(DecodeError::MissingField("error_code"))?;
            let code = ErrorCode::from_code(raw).ok_or(DecodeError::InvalidField("error_code"))?;
            let description = optional_str(&obj, "description")?
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| code.default_description().into());
            MessageBody::Error { code, description }
        }
        MessageKind::Ack => MessageBody::Ack {
            ack_id: required_str(&obj, "ack_id")?,
        },
    };

    Ok(Message {
        id,
        timestamp,
        battery,
        body,
    })
}

fn required_str(obj: &Map<String, Value>, key: &'static str) -> Result<String, DecodeError> {
    optional_str(obj, key)?.ok_or(DecodeError::MissingField(key))
}

fn optional_str(obj: &Map<String, Value>, key: &'static str) -> Result<Option<String>, DecodeError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::InvalidField(key)),
    }
}

fn optional_u64(obj: &Map<String, Value>, key: &'static str) -> Result<Option<u64>, DecodeError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or(DecodeError::InvalidField(key)),
    }
}
