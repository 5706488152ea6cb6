//! WebSocket frames exchanged with relay clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Control event a client sends to check liveness. Never relayed.
pub const PING: &str = "ping";
/// Reply to [`PING`], sent only to the pinging connection.
pub const PONG: &str = "pong";
/// Rejection notice, sent only to the offending connection.
pub const ERROR: &str = "error";

/// A named event with ordered arguments.
///
/// Clients may send either `{"event": "...", "args": [...]}` or the
/// socket.io-style array `["event", arg1, arg2]`. The hub always sends the
/// object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, args: Vec<Value>) -> Self {
        Frame {
            event: event.into(),
            args,
        }
    }

    /// Parse an inbound text frame.
    pub fn parse(text: &str) -> Result<Frame, RelayError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| RelayError::InvalidFrame(e.to_string()))?;

        match value {
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| RelayError::InvalidFrame(e.to_string()))
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                match items.next() {
                    Some(Value::String(event)) => Ok(Frame::new(event, items.collect())),
                    _ => Err(RelayError::InvalidFrame(
                        "array frame must start with an event name".to_string(),
                    )),
                }
            }
            _ => Err(RelayError::InvalidFrame(
                "expected an object or an array".to_string(),
            )),
        }
    }

    pub fn is_ping(&self) -> bool {
        self.event == PING
    }

    pub fn pong() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        Frame::new(PONG, vec![Value::from(ts)])
    }

    /// Error notice carrying the error's code and message.
    pub fn error(err: &RelayError) -> Self {
        let payload = ErrorPayload {
            code: err.code(),
            message: err.to_string(),
        };
        let payload = serde_json::to_value(payload).unwrap_or(Value::Null);
        Frame::new(ERROR, vec![payload])
    }

    /// Serialize to JSON text for sending over WebSocket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"event":"error","args":[{"code":"INTERNAL","message":"serialization failed"}]}"#
                .to_string()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
