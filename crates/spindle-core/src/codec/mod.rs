//! Message codec: wire framing plus payload encode/decode.
//!
//! - [`wire`] moves multipart frame sets across the stream.
//! - [`payload`] interprets a task payload (structured or legacy).
//! - This module's free functions encode/decode the worker's own
//!   outbound message bodies.

pub mod payload;
pub mod wire;

pub use payload::{DecodeError, Decoded, PROTOCOL_VERSION, decode_task_payload, encode_task_payload};
pub use wire::{KILL_SENTINEL, REGISTER, TASK_RET, WRKR_DIE, read_frames, write_frames};

use crate::domain::{ResultMessage, WorkerIdentity};
use crate::error::WorkerError;

/// Encode a result message body. Succeeds for every well-formed
/// `ResultMessage`; the error arm exists only to avoid a panic path.
pub fn encode_result(result: &ResultMessage) -> Result<Vec<u8>, WorkerError> {
    Ok(serde_json::to_vec(result)?)
}

/// Decode a result message body (manager side and tests).
pub fn decode_result(bytes: &[u8]) -> Result<ResultMessage, WorkerError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode the registration payload sent as the first outbound unit.
pub fn encode_registration(identity: &WorkerIdentity) -> Result<Vec<u8>, WorkerError> {
    Ok(serde_json::to_vec(identity)?)
}
