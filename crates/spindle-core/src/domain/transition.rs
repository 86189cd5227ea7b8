//! Task lifecycle transitions.
//!
//! Every executed task reports exactly two transitions: EXEC_START when
//! execution begins and EXEC_END when the result (or captured failure)
//! is assembled. Timestamps are wall-clock nanoseconds so the manager
//! can line them up across workers.

use serde::{Deserialize, Serialize};

/// Lifecycle point of a task as observed by this worker.
///
/// Serialized SCREAMING_SNAKE_CASE to match the wire names the manager
/// expects: EXEC_START / EXEC_END.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    ExecStart,
    ExecEnd,
}

/// Who recorded a transition. Workers only ever record as themselves,
/// but the wire format is shared with other actors on the manager side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorName {
    Worker,
}

/// A timestamped lifecycle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTransition {
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    pub state: TaskState,
    pub actor: ActorName,
}

impl TaskTransition {
    pub fn exec_start(timestamp: i64) -> Self {
        Self {
            timestamp,
            state: TaskState::ExecStart,
            actor: ActorName::Worker,
        }
    }

    pub fn exec_end(timestamp: i64) -> Self {
        Self {
            timestamp,
            state: TaskState::ExecEnd,
            actor: ActorName::Worker,
        }
    }
}
