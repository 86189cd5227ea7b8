//! Task executor: payload in, `ResultMessage` out, nothing thrown.
//!
//! `execute` is a pure payload → result transform (plus whatever the
//! invoked function does): every user-code failure — undecodable
//! payload, unknown callable reference, an error returned by the
//! function, or a panic inside it — is captured at this single
//! boundary and reported back as a structured failure. Only the wire
//! layer can take the worker down.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{DecodeError, decode_task_payload};
use crate::context::WorkerContext;
use crate::domain::{ResultMessage, TaskFailure, TaskTransition};

pub struct TaskExecutor<C: Clock = SystemClock> {
    context: Arc<WorkerContext>,
    clock: C,
}

impl TaskExecutor<SystemClock> {
    pub fn new(context: Arc<WorkerContext>) -> Self {
        Self::with_clock(context, SystemClock)
    }
}

impl<C: Clock> TaskExecutor<C> {
    pub fn with_clock(context: Arc<WorkerContext>, clock: C) -> Self {
        Self { context, clock }
    }

    /// Execute one task payload. Never fails: a failure is a result.
    ///
    /// `container_id` is left unset; the runtime echoes it from the
    /// request when assembling the outbound message.
    pub async fn execute(&self, task_id: &str, payload: &[u8]) -> ResultMessage {
        info!(task_id, "executing task");
        let exec_start = TaskTransition::exec_start(self.clock.now_ns());

        let invoked = self.run_user_code(payload).await;

        let exec_end = TaskTransition::exec_end(self.clock.now_ns());
        let task_statuses = vec![exec_start, exec_end];
        info!(
            task_id,
            elapsed_ns = exec_end.timestamp - exec_start.timestamp,
            ok = invoked.is_ok(),
            "task completed"
        );

        match invoked {
            Ok(data) => ResultMessage::success(task_id, data, task_statuses),
            Err(failure) => {
                warn!(task_id, kind = failure_kind(&failure), "captured user-code failure");
                let exception = render_exception(task_id, &failure);
                ResultMessage::failure(task_id, exception, failure, task_statuses)
            }
        }
    }

    /// Decode, resolve, invoke, serialize, check the size bound.
    ///
    /// Decode failures land here too: the payload came from a trusted
    /// submission pipeline, so malformed content is the submitter's to
    /// see reported back, not a reason to drop the connection.
    async fn run_user_code(&self, payload: &[u8]) -> Result<String, TaskFailure> {
        let decoded = decode_task_payload(payload).map_err(|e| {
            let kind = match &e {
                DecodeError::Malformed(_) => "MalformedPayload",
                DecodeError::WrongMessageType { .. } => "WrongMessageType",
            };
            TaskFailure::user(kind, e.to_string())
        })?;

        let serializer = self.context.serializer();
        let invocation = serializer
            .unpack_invocation(decoded.task_buffer())
            .map_err(|e| TaskFailure::user("DeserializationError", e.to_string()))?;

        let function = self.context.registry().get(&invocation.function).ok_or_else(|| {
            TaskFailure::user(
                "FunctionNotFound",
                format!("no registered function '{}'", invocation.function),
            )
        })?;

        // The function runs on its own task so a panic is contained and
        // surfaces as a JoinError instead of unwinding through the loop.
        let call =
            tokio::spawn(async move { function.call(invocation.args, invocation.kwargs).await });

        let value = match call.await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(TaskFailure::user(err.kind, err.message)),
            Err(join_err) => return Err(TaskFailure::user("Panic", panic_message(join_err))),
        };

        let data = serializer
            .serialize_value(&value)
            .map_err(|e| TaskFailure::user("SerializationError", e.to_string()))?;

        let limit = self.context.result_size_limit();
        if data.len() > limit {
            return Err(TaskFailure::ResultTooLarge {
                actual: data.len() as u64,
                limit: limit as u64,
            });
        }

        Ok(data)
    }
}

fn failure_kind(failure: &TaskFailure) -> &str {
    match failure {
        TaskFailure::UserError { kind, .. } => kind,
        TaskFailure::ResultTooLarge { .. } => "MaxResultSizeExceeded",
    }
}

fn render_exception(task_id: &str, failure: &TaskFailure) -> String {
    match failure {
        TaskFailure::UserError { kind, message } => {
            format!("task {task_id} raised {kind}: {message}")
        }
        TaskFailure::ResultTooLarge { actual, limit } => {
            format!("task {task_id} result of {actual} bytes exceeds the {limit} byte limit")
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "user task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "user code panicked".to_string()
    }
}
