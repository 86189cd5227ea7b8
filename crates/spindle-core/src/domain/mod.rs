//! Domain model (identity, envelopes, transitions, results).

pub mod identity;
pub mod result;
pub mod task;
pub mod transition;

pub use identity::WorkerIdentity;
pub use result::{ResultMessage, TaskFailure, TaskOutcome};
pub use task::TaskEnvelope;
pub use transition::{ActorName, TaskState, TaskTransition};
