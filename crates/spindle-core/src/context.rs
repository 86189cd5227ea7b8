//! WorkerContext - ワーカー1プロセス分の実行コンテキスト
//!
//! Identity, the serializer capability, the function registry and the
//! result-size limit live here and are passed into the executor and
//! runtime constructors explicitly. There is no module-global state to
//! reach for.

use std::sync::Arc;

use crate::domain::WorkerIdentity;
use crate::error::WorkerError;
use crate::registry::{FunctionRegistry, TaskFunction};
use crate::serialize::PayloadSerializer;

/// Default cap on serialized result size: 10 MiB.
pub const DEFAULT_RESULT_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Per-worker context, immutable once built.
pub struct WorkerContext {
    identity: WorkerIdentity,
    serializer: PayloadSerializer,
    registry: Arc<FunctionRegistry>,
    result_size_limit: usize,
}

impl WorkerContext {
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub fn serializer(&self) -> &PayloadSerializer {
        &self.serializer
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn result_size_limit(&self) -> usize {
        self.result_size_limit
    }
}

/// Builder with fail-fast validation.
///
/// `expect_functions` lets a deployment declare the callable references
/// its submissions will use; `build` fails on any missing one instead
/// of letting the first task discover the gap at runtime.
pub struct WorkerBuilder {
    identity: WorkerIdentity,
    registry: FunctionRegistry,
    expected_functions: Option<Vec<String>>,
    result_size_limit: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing functions: {0:?}. These were expected but not registered.")]
    MissingFunctions(Vec<String>),

    #[error(transparent)]
    Registry(#[from] WorkerError),
}

impl WorkerBuilder {
    pub fn new(identity: WorkerIdentity) -> Self {
        Self {
            identity,
            registry: FunctionRegistry::new(),
            expected_functions: None,
            result_size_limit: DEFAULT_RESULT_SIZE_LIMIT,
        }
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        function: Arc<dyn TaskFunction>,
    ) -> Result<Self, WorkerError> {
        self.registry.register(name, function)?;
        Ok(self)
    }

    pub fn expect_functions(mut self, names: &[&str]) -> Self {
        self.expected_functions = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn result_size_limit(mut self, bytes: usize) -> Self {
        self.result_size_limit = bytes;
        self
    }

    pub fn build(self) -> Result<WorkerContext, BuildError> {
        if let Some(expected) = &self.expected_functions {
            let registered = self.registry.registered_names();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingFunctions(missing));
            }
        }

        Ok(WorkerContext {
            identity: self.identity,
            serializer: PayloadSerializer::new(),
            registry: Arc::new(self.registry),
            result_size_limit: self.result_size_limit,
        })
    }
}
