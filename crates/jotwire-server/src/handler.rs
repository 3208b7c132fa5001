use std::fmt;
use std::marker::PhantomData;

use jotwire_decode::{error_response, FromJson, ToJson};
use serde_json::Value;
use tracing::warn;

/// Application callback invoked once per decoded frame.
///
/// A returned value is framed and written back on the same connection.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, message: Value) -> Option<Value>;
}

impl<F> MessageHandler for F
where
    F: Fn(Value) -> Option<Value> + Send + Sync,
{
    fn on_message(&self, message: Value) -> Option<Value> {
        self(message)
    }
}

/// Adapts a callback over a typed message to [`MessageHandler`].
///
/// Payloads that fail to decode are answered with an error frame and the
/// connection stays open.
pub struct TypedHandler<M, F> {
    handler: F,
    _message: PhantomData<fn(M)>,
}

impl<M, F> TypedHandler<M, F> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _message: PhantomData,
        }
    }
}

impl<M, R, F> MessageHandler for TypedHandler<M, F>
where
    M: FromJson,
    R: ToJson,
    F: Fn(M) -> Option<R> + Send + Sync,
{
    fn on_message(&self, message: Value) -> Option<Value> {
        match M::from_json(&message) {
            Ok(decoded) => (self.handler)(decoded).map(|response| response.to_json()),
            Err(err) => {
                warn!(error = %err, "answering undecodable message with an error");
                Some(error_response(&err))
            }
        }
    }
}

impl<M, F> fmt::Debug for TypedHandler<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandler")
            .field("message", &std::any::type_name::<M>())
            .finish()
    }
}
