//! Result model: what a worker reports back for one task.
//!
//! The wire shape is flat — `{task_id, container_id, data | exception +
//! error_details, task_statuses}` — but in memory the data/exception
//! exclusivity is an enum, so "exactly one of the two is present" holds
//! by construction instead of by discipline.

use serde::{Deserialize, Serialize};

use super::transition::TaskTransition;

/// Structured failure detail, enough for the submitter to reconstruct
/// a remote-exception representation.
///
/// `ResultTooLarge` is its own variant rather than a stringly-typed
/// failure: the byte counts are data the submitter acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum TaskFailure {
    /// Anything user code did wrong: payload that would not decode, an
    /// unknown callable reference, an error returned by the callable,
    /// or a panic inside it.
    UserError { kind: String, message: String },

    /// The serialized return value exceeded the configured limit.
    ResultTooLarge { actual: u64, limit: u64 },
}

impl TaskFailure {
    pub fn user(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UserError {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Success XOR failure payload of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskOutcome {
    Success {
        /// Serialized return value of the callable.
        data: String,
    },
    Failure {
        /// Human-readable rendering of what went wrong.
        exception: String,
        error_details: TaskFailure,
    },
}

/// Everything the worker sends back for one executed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub task_id: String,

    /// Echoed from the request by the runtime; the executor leaves it
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    #[serde(flatten)]
    pub outcome: TaskOutcome,

    /// Always exactly two entries: EXEC_START then EXEC_END.
    pub task_statuses: Vec<TaskTransition>,
}

impl ResultMessage {
    pub fn success(
        task_id: impl Into<String>,
        data: String,
        task_statuses: Vec<TaskTransition>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            container_id: None,
            outcome: TaskOutcome::Success { data },
            task_statuses,
        }
    }

    pub fn failure(
        task_id: impl Into<String>,
        exception: String,
        error_details: TaskFailure,
        task_statuses: Vec<TaskTransition>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            container_id: None,
            outcome: TaskOutcome::Failure {
                exception,
                error_details,
            },
            task_statuses,
        }
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success { .. })
    }

    pub fn data(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Success { data } => Some(data),
            TaskOutcome::Failure { .. } => None,
        }
    }

    pub fn exception(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { exception, .. } => Some(exception),
        }
    }

    pub fn error_details(&self) -> Option<&TaskFailure> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { error_details, .. } => Some(error_details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transition::TaskTransition;

    fn statuses() -> Vec<TaskTransition> {
        vec![TaskTransition::exec_start(10), TaskTransition::exec_end(20)]
    }

    #[test]
    fn success_serializes_flat_without_exception() {
        let r = ResultMessage::success("t-1", "\"ok\"".to_string(), statuses())
            .with_container_id("c-1");
        let v: serde_json::Value = serde_json::to_value(&r).unwrap();

        assert_eq!(v["task_id"], "t-1");
        assert_eq!(v["container_id"], "c-1");
        assert_eq!(v["data"], "\"ok\"");
        assert!(v.get("exception").is_none());
        assert_eq!(v["task_statuses"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn failure_serializes_flat_without_data() {
        let r = ResultMessage::failure(
            "t-2",
            "ValueError: boom".to_string(),
            TaskFailure::user("ValueError", "boom"),
            statuses(),
        );
        let v: serde_json::Value = serde_json::to_value(&r).unwrap();

        assert!(v.get("data").is_none());
        assert_eq!(v["exception"], "ValueError: boom");
        assert_eq!(v["error_details"]["kind"], "UserError");
        assert_eq!(v["error_details"]["value"]["kind"], "ValueError");
    }

    #[test]
    fn result_too_large_carries_byte_counts() {
        let r = ResultMessage::failure(
            "t-3",
            "result too large".to_string(),
            TaskFailure::ResultTooLarge {
                actual: 20 * 1024 * 1024,
                limit: 10 * 1024 * 1024,
            },
            statuses(),
        );
        let s = serde_json::to_string(&r).unwrap();
        let back: ResultMessage = serde_json::from_str(&s).unwrap();

        match back.error_details() {
            Some(TaskFailure::ResultTooLarge { actual, limit }) => {
                assert_eq!(*actual, 20 * 1024 * 1024);
                assert_eq!(*limit, 10 * 1024 * 1024);
            }
            other => panic!("expected ResultTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn roundtrip_keeps_success_and_failure_apart() {
        let ok = ResultMessage::success("a", "1".to_string(), statuses());
        let err = ResultMessage::failure(
            "b",
            "oops".to_string(),
            TaskFailure::user("Error", "oops"),
            statuses(),
        );

        let ok_back: ResultMessage =
            serde_json::from_str(&serde_json::to_string(&ok).unwrap()).unwrap();
        let err_back: ResultMessage =
            serde_json::from_str(&serde_json::to_string(&err).unwrap()).unwrap();

        assert!(ok_back.is_success());
        assert!(!err_back.is_success());
        assert_eq!(ok_back, ok);
        assert_eq!(err_back, err);
    }
}
