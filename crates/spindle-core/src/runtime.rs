//! Worker runtime: registration and the receive/execute/send loop.
//!
//! One logical task at a time; the frame read is the only suspension
//! point. The runtime is generic over the stream so the binary hands
//! it a `TcpStream` while tests drive it through `tokio::io::duplex`.
//!
//! Termination paths, deliberately distinct:
//! - cooperative: inbound `task_id == "KILL"` → one `WRKR_DIE` frame,
//!   then [`RunOutcome::Killed`] (exit 0 at the process level);
//! - cancellation flag: a `watch` channel checked between tasks, set by
//!   the OS signal handler (which also exits the process directly) —
//!   [`RunOutcome::Interrupted`] exists so the flag path is testable
//!   without real signals;
//! - error: unparseable frame sets and connection failures return
//!   `Err`; no internal retry, the supervisor respawns the worker.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::codec::{self, wire};
use crate::context::WorkerContext;
use crate::domain::TaskEnvelope;
use crate::error::WorkerError;
use crate::executor::TaskExecutor;

/// How a run ended, for exit-status mapping by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The manager sent KILL and the death notice went out. The only
    /// zero-exit-status path.
    Killed,
    /// The cancellation flag tripped between tasks.
    Interrupted,
}

pub struct WorkerRuntime<S, C: Clock = SystemClock> {
    context: Arc<WorkerContext>,
    executor: TaskExecutor<C>,
    stream: S,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S> WorkerRuntime<S, SystemClock>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        context: Arc<WorkerContext>,
        stream: S,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let executor = TaskExecutor::new(Arc::clone(&context));
        Self {
            context,
            executor,
            stream,
            shutdown_rx,
        }
    }
}

impl<S, C> WorkerRuntime<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Clock,
{
    /// Register, then loop until KILL, cancellation, or a fatal error.
    pub async fn run(mut self) -> Result<RunOutcome, WorkerError> {
        self.send_registration().await?;

        loop {
            if *self.shutdown_rx.borrow() {
                info!("cancellation flag set; stopping between tasks");
                return Ok(RunOutcome::Interrupted);
            }

            let frames = tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        // Sender gone: no cancellation can ever arrive,
                        // so just block on the next message.
                        wire::read_frames(&mut self.stream).await?
                    } else {
                        continue;
                    }
                }
                frames = wire::read_frames(&mut self.stream) => frames?,
            };

            let envelope = resolve_envelope(frames)?;

            if envelope.task_id() == wire::KILL_SENTINEL {
                info!("KILL received; sending death notice");
                wire::write_frames(&mut self.stream, &[wire::WRKR_DIE, b""]).await?;
                return Ok(RunOutcome::Killed);
            }

            info!(task_id = envelope.task_id(), "received task");
            let result = self
                .executor
                .execute(envelope.task_id(), envelope.payload())
                .await
                .with_container_id(envelope.container_id());

            let body = codec::encode_result(&result)?;
            wire::write_frames(&mut self.stream, &[wire::TASK_RET, &body]).await?;
            info!(task_id = envelope.task_id(), "sent result");
        }
    }

    /// First outbound unit, fire-and-forget: the manager does not ack.
    async fn send_registration(&mut self) -> Result<(), WorkerError> {
        let identity = self.context.identity();
        info!(
            worker_id = identity.worker_id(),
            worker_type = identity.worker_type(),
            "sending registration"
        );
        let body = codec::encode_registration(identity)?;
        wire::write_frames(&mut self.stream, &[wire::REGISTER, &body]).await
    }
}

/// Resolve an inbound frame set to a task envelope.
///
/// A frame set that does not yield a task identity has nothing to
/// report an error against, so it is a protocol error that takes the
/// worker down.
fn resolve_envelope(mut frames: Vec<Vec<u8>>) -> Result<TaskEnvelope, WorkerError> {
    if frames.len() != 3 {
        error!(frames = frames.len(), "expected 3-part task message");
        return Err(WorkerError::Protocol(format!(
            "expected 3 frames, got {}",
            frames.len()
        )));
    }

    let payload = frames.pop().unwrap_or_default();
    let container_id = frames.pop().unwrap_or_default();
    let task_id = frames.pop().unwrap_or_default();

    let task_id = String::from_utf8(task_id)
        .map_err(|_| WorkerError::Protocol("task_id frame is not UTF-8".to_string()))?;
    let container_id = String::from_utf8(container_id)
        .map_err(|_| WorkerError::Protocol("container_id frame is not UTF-8".to_string()))?;

    Ok(TaskEnvelope::new(task_id, container_id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_task_payload;
    use crate::context::WorkerBuilder;
    use crate::domain::WorkerIdentity;
    use crate::registry::{FunctionError, TaskFunction};
    use crate::serialize::{Invocation, PayloadSerializer};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;

    struct Hello;

    #[async_trait]
    impl TaskFunction for Hello {
        async fn call(
            &self,
            _args: Vec<Value>,
            _kwargs: serde_json::Map<String, Value>,
        ) -> Result<Value, FunctionError> {
            Ok(json!("Hello world"))
        }
    }

    struct EchoFirst;

    #[async_trait]
    impl TaskFunction for EchoFirst {
        async fn call(
            &self,
            args: Vec<Value>,
            _kwargs: serde_json::Map<String, Value>,
        ) -> Result<Value, FunctionError> {
            Ok(args.into_iter().next().unwrap_or(Value::Null))
        }
    }

    struct Harness {
        manager: DuplexStream,
        shutdown_tx: watch::Sender<bool>,
        worker: JoinHandle<Result<RunOutcome, WorkerError>>,
    }

    fn spawn_worker() -> Harness {
        let context = WorkerBuilder::new(WorkerIdentity::new("wrk-1", "RAW"))
            .register("hello", Arc::new(Hello))
            .unwrap()
            .register("echo", Arc::new(EchoFirst))
            .unwrap()
            .build()
            .unwrap();

        let (worker_side, manager) = tokio::io::duplex(256 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runtime = WorkerRuntime::new(Arc::new(context), worker_side, shutdown_rx);
        let worker = tokio::spawn(runtime.run());

        Harness {
            manager,
            shutdown_tx,
            worker,
        }
    }

    fn task_payload(invocation: &Invocation) -> Vec<u8> {
        let buffer = PayloadSerializer::new().pack_invocation(invocation).unwrap();
        encode_task_payload(&buffer)
    }

    async fn read_registration(h: &mut Harness) {
        let frames = wire::read_frames(&mut h.manager).await.unwrap();
        assert_eq!(frames[0], wire::REGISTER);
        let identity: WorkerIdentity = serde_json::from_slice(&frames[1]).unwrap();
        assert_eq!(identity.worker_id(), "wrk-1");
    }

    #[tokio::test]
    async fn registration_is_the_first_outbound_unit() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        wire::write_frames(&mut h.manager, &[b"KILL", b"", b""])
            .await
            .unwrap();
        let frames = wire::read_frames(&mut h.manager).await.unwrap();
        assert_eq!(frames[0], wire::WRKR_DIE);

        assert_eq!(h.worker.await.unwrap().unwrap(), RunOutcome::Killed);
    }

    #[tokio::test]
    async fn task_result_echoes_container_id() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        let payload = task_payload(&Invocation::new("hello"));
        wire::write_frames(&mut h.manager, &[b"t-1", b"c-9", &payload])
            .await
            .unwrap();

        let frames = wire::read_frames(&mut h.manager).await.unwrap();
        assert_eq!(frames[0], wire::TASK_RET);
        let result = codec::decode_result(&frames[1]).unwrap();
        assert_eq!(result.task_id, "t-1");
        assert_eq!(result.container_id.as_deref(), Some("c-9"));
        assert!(result.is_success());

        wire::write_frames(&mut h.manager, &[b"KILL", b"", b""])
            .await
            .unwrap();
        assert_eq!(h.worker.await.unwrap().unwrap(), RunOutcome::Killed);
    }

    #[tokio::test]
    async fn results_leave_in_arrival_order() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        for (task_id, value) in [("t-1", json!(1)), ("t-2", json!(2)), ("t-3", json!(3))] {
            let payload = task_payload(&Invocation::new("echo").with_arg(value));
            wire::write_frames(&mut h.manager, &[task_id.as_bytes(), b"c", &payload])
                .await
                .unwrap();
        }

        for expected_id in ["t-1", "t-2", "t-3"] {
            let frames = wire::read_frames(&mut h.manager).await.unwrap();
            let result = codec::decode_result(&frames[1]).unwrap();
            assert_eq!(result.task_id, expected_id);
        }

        wire::write_frames(&mut h.manager, &[b"KILL", b"", b""])
            .await
            .unwrap();
        assert_eq!(h.worker.await.unwrap().unwrap(), RunOutcome::Killed);
    }

    #[tokio::test]
    async fn kill_yields_exactly_one_death_notice() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        wire::write_frames(&mut h.manager, &[b"KILL", b"", b""])
            .await
            .unwrap();

        let frames = wire::read_frames(&mut h.manager).await.unwrap();
        assert_eq!(frames, vec![wire::WRKR_DIE.to_vec(), Vec::new()]);
        assert_eq!(h.worker.await.unwrap().unwrap(), RunOutcome::Killed);

        // The worker is gone; its side of the stream is closed.
        let err = wire::read_frames(&mut h.manager).await.unwrap_err();
        assert!(matches!(err, WorkerError::Connection(_)));
    }

    #[tokio::test]
    async fn cancellation_flag_interrupts_between_tasks() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        h.shutdown_tx.send(true).unwrap();

        let outcome = h.worker.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Interrupted);
    }

    #[tokio::test]
    async fn failed_task_still_produces_a_result() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        let payload = task_payload(&Invocation::new("not-registered"));
        wire::write_frames(&mut h.manager, &[b"t-1", b"c", &payload])
            .await
            .unwrap();

        let frames = wire::read_frames(&mut h.manager).await.unwrap();
        let result = codec::decode_result(&frames[1]).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.task_id, "t-1");

        wire::write_frames(&mut h.manager, &[b"KILL", b"", b""])
            .await
            .unwrap();
        assert_eq!(h.worker.await.unwrap().unwrap(), RunOutcome::Killed);
    }

    #[tokio::test]
    async fn wrong_frame_count_is_fatal() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        wire::write_frames(&mut h.manager, &[b"t-1", b"no payload frame"])
            .await
            .unwrap();

        let err = h.worker.await.unwrap().unwrap_err();
        assert!(matches!(err, WorkerError::Protocol(_)));
    }

    #[tokio::test]
    async fn non_utf8_task_identity_is_fatal() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        wire::write_frames(&mut h.manager, &[&[0xff, 0xfe][..], b"c", b"{}"])
            .await
            .unwrap();

        let err = h.worker.await.unwrap().unwrap_err();
        assert!(matches!(err, WorkerError::Protocol(_)));
    }

    #[tokio::test]
    async fn closed_connection_is_fatal() {
        let mut h = spawn_worker();
        read_registration(&mut h).await;

        drop(h.manager);

        let err = h.worker.await.unwrap().unwrap_err();
        assert!(matches!(err, WorkerError::Connection(_)));
    }
}
