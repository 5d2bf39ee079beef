//! JSON wire messages exchanged with a relay (§4.D).
//!
//! Nostr relay messages are untagged JSON arrays (`["EVENT", ...]`), not
//! struct-shaped objects, so these types carry their own
//! serialize/parse logic rather than deriving `serde::{Serialize,
//! Deserialize}` directly.

use serde_json::Value;

use crate::envelope::Event;

use super::error::{Error, Result};

/// A message this crate sends to a relay.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// `["EVENT", event]`
    Event(Event),
    /// `["REQ", subid, filter]`
    Req { subid: String, filter: Value },
    /// `["CLOSE", subid]`
    Close { subid: String },
}

impl ClientMessage {
    /// Serializes this message to the JSON-array text frame a relay expects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the event does not serialize (should
    /// not happen for well-formed `Event`s).
    pub fn to_text(&self) -> Result<String> {
        let value = match self {
            Self::Event(event) => {
                let event_json =
                    serde_json::to_value(event).map_err(|e| Error::Protocol(e.to_string()))?;
                Value::Array(vec![Value::String("EVENT".to_string()), event_json])
            }
            Self::Req { subid, filter } => Value::Array(vec![
                Value::String("REQ".to_string()),
                Value::String(subid.clone()),
                filter.clone(),
            ]),
            Self::Close { subid } => {
                Value::Array(vec![Value::String("CLOSE".to_string()), Value::String(subid.clone())])
            }
        };
        serde_json::to_string(&value).map_err(|e| Error::Protocol(e.to_string()))
    }
}

/// A message a relay sends to this crate.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    /// `["EVENT", subid, event]`
    Event { subid: String, event: Event },
    /// `["OK", event_id, accepted, message]`
    Ok { event_id: String, accepted: bool, message: String },
    /// `["EOSE", subid]`
    Eose { subid: String },
    /// `["NOTICE", message]`
    Notice { message: String },
    /// `["CLOSED", subid, message]`
    Closed { subid: String, message: String },
}

/// Parses a text frame received from a relay into a [`RelayMessage`].
///
/// # Errors
///
/// Returns [`Error::Protocol`] if `text` is not a JSON array, has an
/// unrecognized tag, or is missing fields the tag requires.
pub fn parse_relay_message(text: &str) -> Result<RelayMessage> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::Protocol(e.to_string()))?;
    let arr = value.as_array().ok_or_else(|| Error::Protocol("expected a JSON array".to_string()))?;
    let tag = arr.first().and_then(Value::as_str).ok_or_else(|| Error::Protocol("missing message tag".to_string()))?;

    match tag {
        "EVENT" => {
            let subid = arr.get(1).and_then(Value::as_str).ok_or_else(|| missing("EVENT", "subid"))?.to_string();
            let event_value = arr.get(2).ok_or_else(|| missing("EVENT", "event"))?;
            let event: Event = serde_json::from_value(event_value.clone()).map_err(|e| Error::Protocol(e.to_string()))?;
            Ok(RelayMessage::Event { subid, event })
        }
        "OK" => {
            let event_id = arr.get(1).and_then(Value::as_str).ok_or_else(|| missing("OK", "event_id"))?.to_string();
            let accepted = arr.get(2).and_then(Value::as_bool).ok_or_else(|| missing("OK", "accepted"))?;
            let message = arr.get(3).and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(RelayMessage::Ok { event_id, accepted, message })
        }
        "EOSE" => {
            let subid = arr.get(1).and_then(Value::as_str).ok_or_else(|| missing("EOSE", "subid"))?.to_string();
            Ok(RelayMessage::Eose { subid })
        }
        "NOTICE" => {
            let message = arr.get(1).and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(RelayMessage::Notice { message })
        }
        "CLOSED" => {
            let subid = arr.get(1).and_then(Value::as_str).ok_or_else(|| missing("CLOSED", "subid"))?.to_string();
            let message = arr.get(2).and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(RelayMessage::Closed { subid, message })
        }
        other => Err(Error::Protocol(format!("unknown message tag '{other}'"))),
    }
}

fn missing(tag: &str, field: &str) -> Error {
    Error::Protocol(format!("{tag} message missing '{field}'"))
}
