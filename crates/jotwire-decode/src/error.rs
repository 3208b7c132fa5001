use crate::aggregate::{Aggregate, AggregatedError};

/// Errors produced while decoding a JSON payload into a typed message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The value is not a JSON object.
    #[error("not a dictionary")]
    NotAnObject,

    /// A required key is absent.
    #[error("no {key}")]
    Missing { key: String },

    /// A key is absent or holds the wrong kind of value.
    #[error("expected {key} to be {expected}")]
    WrongType { key: String, expected: &'static str },

    /// The message object has no string `type`.
    #[error("no message type")]
    MissingType,

    /// A view object has no string `type`.
    #[error("no view type")]
    MissingViewType,

    #[error("message not understood: {0}")]
    UnknownMessage(String),

    #[error("view type not understood: {0}")]
    UnknownView(String),

    /// A message type that was renamed in an earlier protocol revision.
    #[error("\"{old}\" is now renamed to \"{new}\"")]
    Renamed {
        old: &'static str,
        new: &'static str,
    },

    /// Several fields failed in one decode pass.
    #[error("{0}")]
    Multiple(AggregatedError<ValidationError>),
}

impl ValidationError {
    pub(crate) fn wrong_type(key: &str, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.to_string(),
            expected,
        }
    }

    /// Every underlying failure, flattening nested aggregates.
    pub fn leaves(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Multiple(agg) => agg.iter().flat_map(|err| err.leaves()).collect(),
            other => vec![other],
        }
    }
}

impl Aggregate for ValidationError {
    fn aggregate(errors: AggregatedError<Self>) -> Self {
        ValidationError::Multiple(errors)
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
