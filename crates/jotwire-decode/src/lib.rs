//! Decoding of JSON payloads into typed jotwire messages.
//!
//! Decoding never stops at the first bad field: independent fields are checked in
//! one pass and every failure is reported. A single failure comes back as-is; two
//! or more are wrapped in [`ValidationError::Multiple`].

pub mod aggregate;
pub mod error;
pub mod fields;
pub mod message;
pub mod view;

pub use aggregate::{combine, evaluate_all, map_all, Aggregate, AggregatedError, EvaluateAll};
pub use error::{Result, ValidationError};
pub use fields::{as_object, JsonObject, Object};
pub use message::{error_response, FromJson, Message, ReturnMessage, ToJson};
pub use view::{StackDirection, ViewEmbedding};
