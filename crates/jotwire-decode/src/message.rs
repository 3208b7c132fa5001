//! Typed messages exchanged with an application over the wire.

use serde_json::{json, Value};
use tracing::debug;

use crate::aggregate::EvaluateAll;
use crate::error::{Result, ValidationError};
use crate::fields::{as_object, JsonObject};
use crate::view::{view_field, ViewEmbedding};

/// Decode a typed value from a JSON payload.
pub trait FromJson: Sized {
    fn from_json(value: &Value) -> Result<Self>;
}

/// Encode a typed value as a JSON payload.
pub trait ToJson {
    fn to_json(&self) -> Value;
}

impl FromJson for Value {
    fn from_json(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl ToJson for Value {
    fn to_json(&self) -> Value {
        self.clone()
    }
}

/// A message sent by an application.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Open a window showing `root`.
    Window {
        title: String,
        width: i64,
        height: i64,
        root: ViewEmbedding,
    },
    /// Ask for the current value of a view property.
    GetValue { id: String, property: String },
    /// Replace a view property.
    SetValue {
        id: String,
        property: String,
        value: Value,
    },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Window { .. } => "window",
            Message::GetValue { .. } => "get",
            Message::SetValue { .. } => "set",
        }
    }
}

impl FromJson for Message {
    fn from_json(value: &Value) -> Result<Self> {
        let object = as_object(value)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingType)?;

        let message = match kind {
            "window" => {
                let (title, width, height, root) = (
                    || object.string("title"),
                    || object.int("width"),
                    || object.int("height"),
                    || view_field(object, "root"),
                )
                    .evaluate_all()?;
                Message::Window {
                    title,
                    width,
                    height,
                    root,
                }
            }
            "get" => {
                let (id, property) =
                    (|| object.string("id"), || object.string("property")).evaluate_all()?;
                Message::GetValue { id, property }
            }
            "set" => {
                let (id, property, value) = (
                    || object.string("id"),
                    || object.string("property"),
                    || object.value("value").cloned(),
                )
                    .evaluate_all()?;
                Message::SetValue {
                    id,
                    property,
                    value,
                }
            }
            "app" => {
                return Err(ValidationError::Renamed {
                    old: "app",
                    new: "window",
                })
            }
            other => return Err(ValidationError::UnknownMessage(other.to_string())),
        };

        debug!(kind = message.kind(), "decoded message");
        Ok(message)
    }
}

impl ToJson for Message {
    fn to_json(&self) -> Value {
        match self {
            Message::Window {
                title,
                width,
                height,
                root,
            } => json!({
                "type": "window",
                "title": title,
                "width": width,
                "height": height,
                "root": root.to_json(),
            }),
            Message::GetValue { id, property } => {
                json!({"type": "get", "id": id, "property": property})
            }
            Message::SetValue {
                id,
                property,
                value,
            } => json!({"type": "set", "id": id, "property": property, "value": value}),
        }
    }
}

/// A message sent back to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnMessage {
    ButtonClick {
        id: String,
    },
    Value {
        id: String,
        property: String,
        value: Value,
    },
    Error {
        message: String,
    },
    /// Greeting carrying the protocol implementation version.
    Hello,
}

impl ToJson for ReturnMessage {
    fn to_json(&self) -> Value {
        match self {
            ReturnMessage::ButtonClick { id } => json!({"type": "click", "receiver": id}),
            ReturnMessage::Value {
                id,
                property,
                value,
            } => json!({
                "type": "value",
                "receiver": id,
                "property": property,
                "value": value,
            }),
            ReturnMessage::Error { message } => json!({"type": "error", "message": message}),
            ReturnMessage::Hello => json!({"type": "hello", "version": env!("CARGO_PKG_VERSION")}),
        }
    }
}

impl FromJson for ReturnMessage {
    fn from_json(value: &Value) -> Result<Self> {
        let object = as_object(value)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingType)?;
        match kind {
            "click" => Ok(ReturnMessage::ButtonClick {
                id: object.string("receiver")?,
            }),
            "value" => {
                let (id, property, value) = (
                    || object.string("receiver"),
                    || object.string("property"),
                    || object.value("value").cloned(),
                )
                    .evaluate_all()?;
                Ok(ReturnMessage::Value {
                    id,
                    property,
                    value,
                })
            }
            "error" => Ok(ReturnMessage::Error {
                message: object.string("message")?,
            }),
            "hello" => Ok(ReturnMessage::Hello),
            other => Err(ValidationError::UnknownMessage(other.to_string())),
        }
    }
}

impl From<&ValidationError> for ReturnMessage {
    fn from(err: &ValidationError) -> Self {
        ReturnMessage::Error {
            message: err.to_string(),
        }
    }
}

/// The error frame answered for a payload that failed to decode.
pub fn error_response(err: &ValidationError) -> Value {
    ReturnMessage::from(err).to_json()
}
