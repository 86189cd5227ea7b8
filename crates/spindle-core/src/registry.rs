//! Function registry: callable references resolved to registered code.
//!
//! The submission side serializes a callable *reference* (a name); the
//! worker resolves it here. Built mutable during startup, immutable at
//! runtime — no locks needed on the hot path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::WorkerError;

/// A failure produced by (or on behalf of) user code. `kind` is the
/// exception-kind name the submitter sees in `error_details`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FunctionError {
    pub kind: String,
    pub message: String,
}

impl FunctionError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// A function that can be invoked by task submissions.
///
/// Takes the whole positional/keyword argument set so implementations
/// can decode arguments however they like (serde structs, raw values).
#[async_trait]
pub trait TaskFunction: Send + Sync {
    async fn call(
        &self,
        args: Vec<Value>,
        kwargs: serde_json::Map<String, Value>,
    ) -> Result<Value, FunctionError>;
}

/// Registry of invokable functions (name -> function).
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn TaskFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register a function under a name. Double registration is a
    /// startup bug, not something to silently overwrite.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn TaskFunction>,
    ) -> Result<(), WorkerError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(WorkerError::DuplicateFunction(name));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    /// Cloned so the caller can move the function onto a spawned task.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
