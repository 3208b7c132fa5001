use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::aggregate::{map_all, EvaluateAll};
use crate::error::{Result, ValidationError};
use crate::fields::{as_object, JsonObject, Object};
use crate::message::{FromJson, ToJson};

/// Layout direction of a stack view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackDirection {
    Horizontal,
    Vertical,
}

impl StackDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            StackDirection::Horizontal => "horizontal",
            StackDirection::Vertical => "vertical",
        }
    }
}

impl FromStr for StackDirection {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "horizontal" => Ok(StackDirection::Horizontal),
            "vertical" => Ok(StackDirection::Vertical),
            _ => Err(ValidationError::wrong_type("direction", "a StackDirection")),
        }
    }
}

impl fmt::Display for StackDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a view tree sent by the application.
///
/// Every view may carry an `id` so later `get`/`set` messages can address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEmbedding {
    Button {
        id: Option<String>,
        title: String,
    },
    Label {
        id: Option<String>,
        title: String,
    },
    TextView {
        id: Option<String>,
        text: String,
        editable: bool,
    },
    Stack {
        id: Option<String>,
        items: Vec<ViewEmbedding>,
        direction: StackDirection,
    },
}

impl ViewEmbedding {
    pub fn id(&self) -> Option<&str> {
        match self {
            ViewEmbedding::Button { id, .. }
            | ViewEmbedding::Label { id, .. }
            | ViewEmbedding::TextView { id, .. }
            | ViewEmbedding::Stack { id, .. } => id.as_deref(),
        }
    }

    /// Visit this view and all of its descendants, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ViewEmbedding)) {
        visit(self);
        if let ViewEmbedding::Stack { items, .. } = self {
            for item in items {
                item.walk(visit);
            }
        }
    }

    pub fn from_object(object: &Object) -> Result<Self> {
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingViewType)?;
        let id = object.optional_string("id");

        match kind {
            "button" => Ok(ViewEmbedding::Button {
                id,
                title: object.string("title")?,
            }),
            "label" => Ok(ViewEmbedding::Label {
                id,
                title: object.string("title")?,
            }),
            "text" => {
                let (text, editable) =
                    (|| object.string("text"), || object.bool("editable")).evaluate_all()?;
                Ok(ViewEmbedding::TextView { id, text, editable })
            }
            "stack" => {
                let (raw_items, direction) = (
                    || object.array("items"),
                    || object.raw::<StackDirection>("direction", "a StackDirection"),
                )
                    .evaluate_all()?;
                let items = map_all(raw_items, |item| {
                    as_object(item).and_then(ViewEmbedding::from_object)
                })?;
                Ok(ViewEmbedding::Stack {
                    id,
                    items,
                    direction,
                })
            }
            other => Err(ValidationError::UnknownView(other.to_string())),
        }
    }
}

impl FromJson for ViewEmbedding {
    fn from_json(value: &Value) -> Result<Self> {
        as_object(value).and_then(ViewEmbedding::from_object)
    }
}

impl ToJson for ViewEmbedding {
    fn to_json(&self) -> Value {
        let (id, mut body) = match self {
            ViewEmbedding::Button { id, title } => {
                (id, json!({"type": "button", "title": title}))
            }
            ViewEmbedding::Label { id, title } => (id, json!({"type": "label", "title": title})),
            ViewEmbedding::TextView { id, text, editable } => (
                id,
                json!({"type": "text", "text": text, "editable": editable}),
            ),
            ViewEmbedding::Stack {
                id,
                items,
                direction,
            } => (
                id,
                json!({
                    "type": "stack",
                    "items": items.iter().map(ToJson::to_json).collect::<Vec<_>>(),
                    "direction": direction.as_str(),
                }),
            ),
        };
        if let (Some(id), Some(map)) = (id, body.as_object_mut()) {
            map.insert("id".to_string(), Value::String(id.clone()));
        }
        body
    }
}

/// Decode the view stored under `key`.
pub(crate) fn view_field(object: &Map<String, Value>, key: &str) -> Result<ViewEmbedding> {
    object.object(key).and_then(ViewEmbedding::from_object)
}
