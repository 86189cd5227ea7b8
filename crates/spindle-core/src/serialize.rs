//! The serializer capability shared with the submission side.
//!
//! A task buffer round-trips a callable *reference* plus its
//! positional and keyword arguments; result values round-trip the same
//! way in the other direction. The serializer is held by the worker
//! context and passed into the executor explicitly — nothing in this
//! crate reaches for module-global codec state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A deserialized task body: which registered function to call, and
/// with what. Untrusted until `unpack_invocation` succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub kwargs: serde_json::Map<String, Value>,
}

impl Invocation {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: serde_json::Map::new(),
        }
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("could not deserialize task buffer: {0}")]
    Unpack(#[source] serde_json::Error),

    #[error("could not serialize value: {0}")]
    Pack(#[source] serde_json::Error),
}

/// JSON round-trip of invocations and result values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadSerializer;

impl PayloadSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Submission side: invocation -> task buffer.
    pub fn pack_invocation(&self, invocation: &Invocation) -> Result<String, SerializeError> {
        serde_json::to_string(invocation).map_err(SerializeError::Pack)
    }

    /// Worker side: task buffer -> invocation.
    pub fn unpack_invocation(&self, buffer: &str) -> Result<Invocation, SerializeError> {
        serde_json::from_str(buffer).map_err(SerializeError::Unpack)
    }

    /// Worker side: return value -> serialized result data.
    pub fn serialize_value(&self, value: &Value) -> Result<String, SerializeError> {
        serde_json::to_string(value).map_err(SerializeError::Pack)
    }

    /// Submission side: serialized result data -> value.
    pub fn deserialize_value(&self, data: &str) -> Result<Value, SerializeError> {
        serde_json::from_str(data).map_err(SerializeError::Unpack)
    }
}
