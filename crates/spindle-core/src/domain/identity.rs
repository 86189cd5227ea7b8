use serde::{Deserialize, Serialize};

/// Stable identity of one worker process.
///
/// Set once at startup and immutable for the process lifetime. The
/// serialized form is the registration payload sent to the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    worker_id: String,
    worker_type: String,
}

impl WorkerIdentity {
    pub fn new(worker_id: impl Into<String>, worker_type: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_type: worker_type.into(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn worker_type(&self) -> &str {
        &self.worker_type
    }
}
