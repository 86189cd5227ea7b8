//! spindle-core
//!
//! Worker side of a distributed function-execution platform: connect
//! to a manager, register, then receive tasks, execute them in
//! isolation, and send back results or structured error reports.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（identity, envelope, transition, result）
//! - **codec**: wire framing + structured/legacy payload decode
//! - **serialize**: invocation/result round-trip（serializer capability）
//! - **registry**: callable reference → registered function
//! - **context**: per-worker context and fail-fast builder
//! - **executor**: payload → ResultMessage, user failures contained
//! - **runtime**: connection, registration, receive/execute/send loop
//! - **clock**: time source abstraction for deterministic tests

pub mod clock;
pub mod codec;
pub mod context;
pub mod domain;
pub mod error;
pub mod executor;
pub mod registry;
pub mod runtime;
pub mod serialize;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{DEFAULT_RESULT_SIZE_LIMIT, WorkerBuilder, WorkerContext};
pub use domain::{ResultMessage, TaskEnvelope, TaskFailure, WorkerIdentity};
pub use error::WorkerError;
pub use executor::TaskExecutor;
pub use registry::{FunctionError, FunctionRegistry, TaskFunction};
pub use runtime::{RunOutcome, WorkerRuntime};
pub use serialize::{Invocation, PayloadSerializer};
