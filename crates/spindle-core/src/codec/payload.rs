//! Task payload decode: structured envelope with legacy fallback.
//!
//! Submissions arrive in one of two shapes:
//!
//! - **Structured**: a self-describing, versioned JSON envelope
//!   `{"version": 1, "kind": "task", "task_buffer": "..."}`.
//! - **Legacy**: the whole payload is one opaque UTF-8 task buffer.
//!   Retained for compatibility with older submission pipelines.
//!
//! Decode is a total function over the two shapes: the result is a
//! tagged variant dispatched by `match`, not an exception chain. An
//! envelope that parses but names a non-task message kind is a hard
//! error — falling back would execute something that was never a task.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version this worker understands. Anything else falls back to the
/// legacy interpretation rather than failing, so newer managers can
/// keep old workers alive during a rollout.
pub const PROTOCOL_VERSION: u64 = 1;

/// Message kinds that exist in the structured protocol. Only `task`
/// is valid inbound on a worker; the others are recognized so they can
/// be rejected by name instead of falling through to legacy.
const KNOWN_KINDS: [&str; 3] = ["task", "result", "registration"];

#[derive(Debug, Serialize, Deserialize)]
struct TaskMessage {
    version: u64,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_buffer: Option<String>,
}

/// Outcome of a payload decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Task buffer from a structured v1 envelope.
    Structured(String),
    /// Whole payload interpreted as an opaque legacy task buffer.
    Legacy(String),
}

impl Decoded {
    pub fn task_buffer(&self) -> &str {
        match self {
            Decoded::Structured(buf) | Decoded::Legacy(buf) => buf,
        }
    }
}

/// Non-retryable decode failure for a single task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Neither the structured nor the legacy interpretation applies.
    #[error("malformed task payload: {0}")]
    Malformed(String),

    /// A valid structured envelope that is not a task.
    #[error("wrong message kind in worker: '{got}' (expected 'task')")]
    WrongMessageType { got: String },
}

/// Decode an inbound task payload.
pub fn decode_task_payload(payload: &[u8]) -> Result<Decoded, DecodeError> {
    match serde_json::from_slice::<TaskMessage>(payload) {
        Ok(msg) if msg.version == PROTOCOL_VERSION => {
            if msg.kind == "task" {
                match msg.task_buffer {
                    Some(buffer) => Ok(Decoded::Structured(buffer)),
                    // Structurally incomplete envelope; treat like any
                    // other invalid structure.
                    None => decode_legacy(payload),
                }
            } else if KNOWN_KINDS.contains(&msg.kind.as_str()) {
                Err(DecodeError::WrongMessageType { got: msg.kind })
            } else {
                decode_legacy(payload)
            }
        }
        // Unrecognized version or invalid structure.
        _ => decode_legacy(payload),
    }
}

fn decode_legacy(payload: &[u8]) -> Result<Decoded, DecodeError> {
    match std::str::from_utf8(payload) {
        Ok(buffer) => Ok(Decoded::Legacy(buffer.to_string())),
        Err(e) => Err(DecodeError::Malformed(format!(
            "not a structured envelope and not UTF-8: {e}"
        ))),
    }
}

/// Encode a task buffer into the structured v1 envelope. The worker
/// itself never sends tasks; this exists for the submission side and
/// for round-trip tests.
pub fn encode_task_payload(task_buffer: &str) -> Vec<u8> {
    let msg = TaskMessage {
        version: PROTOCOL_VERSION,
        kind: "task".to_string(),
        task_buffer: Some(task_buffer.to_string()),
    };
    // A string field cannot fail JSON serialization.
    serde_json::to_vec(&msg).unwrap_or_default()
}
