//! Wire protocol for the duplex session channel.
//!
//! Messages are JSON arrays whose first element is a discriminator string:
//!
//! | direction       | shape                          |
//! |-----------------|--------------------------------|
//! | server → client | `["setup", {}]`                |
//! | server → client | `["stdout", "<text>"]`         |
//! | server → client | `["disconnect", <code>]`       |
//! | client → server | `["stdin", "<text>"]`          |
//! | client → server | `["set_size", <rows>, <cols>]` |

use serde_json::{json, Value};

use crate::error::{GatewayError, Result};

/// Message sent by a client over the session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Bytes to write to the session's process.
    Stdin(String),
    /// Resize request.
    SetSize { rows: u16, cols: u16 },
}

impl ClientMessage {
    /// Parse an inbound message.
    ///
    /// Any shape violation (not an array, unknown discriminator, wrong
    /// arity or element types) is a [`GatewayError::Protocol`]; the caller
    /// decides whether to ignore the message or drop the connection.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| GatewayError::Protocol(format!("invalid JSON: {e}")))?;

        let items = value
            .as_array()
            .ok_or_else(|| GatewayError::Protocol("message is not an array".into()))?;

        let discriminator = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Protocol("missing discriminator".into()))?;

        match discriminator {
            "stdin" => {
                let data = items
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| GatewayError::Protocol("stdin payload must be a string".into()))?;
                Ok(Self::Stdin(data.to_string()))
            }
            "set_size" => {
                let rows = Self::dimension(items.get(1), "rows")?;
                let cols = Self::dimension(items.get(2), "cols")?;
                Ok(Self::SetSize { rows, cols })
            }
            other => Err(GatewayError::Protocol(format!(
                "unknown discriminator: {other}"
            ))),
        }
    }

    fn dimension(value: Option<&Value>, field: &str) -> Result<u16> {
        value
            .and_then(Value::as_u64)
            .and_then(|n| u16::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| GatewayError::Protocol(format!("{field} must be a positive integer")))
    }
}

/// Message sent by the server over the session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Session attached and ready.
    Setup,
    /// Output bytes from the session.
    Stdout(String),
    /// The session process ended; the client should stop.
    Disconnect(i64),
}

impl ServerMessage {
    /// Serialize to the wire form.
    pub fn to_json(&self) -> String {
        let value = match self {
            Self::Setup => json!(["setup", {}]),
            Self::Stdout(data) => json!(["stdout", data]),
            Self::Disconnect(code) => json!(["disconnect", code]),
        };
        value.to_string()
    }
}
