//! Worker process entry point.
//!
//! Connects to the manager, registers, and runs the task loop. Exit
//! status is 0 only for a KILL-initiated shutdown; everything else is
//! non-zero and left to the supervising process to respawn.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spindle_core::registry::FunctionError;
use spindle_core::runtime::RunOutcome;
use spindle_core::{TaskFunction, WorkerBuilder, WorkerIdentity, WorkerRuntime};

#[derive(Parser, Debug)]
#[command(name = "spindle-worker", about = "Task execution worker")]
struct Args {
    /// ID of this worker, assigned by the process pool.
    #[arg(short = 'w', long)]
    worker_id: String,

    /// Address at which the manager can be reached.
    #[arg(short = 'a', long)]
    address: String,

    /// Port at which the worker connects to the manager.
    #[arg(short = 'p', long)]
    port: u16,

    /// Directory where this worker's log file is written.
    #[arg(long)]
    logdir: PathBuf,

    /// Worker type tag reported at registration.
    #[arg(short = 't', long = "type", default_value = "RAW")]
    worker_type: String,

    /// Verbose logging.
    #[arg(short = 'd', long)]
    debug: bool,
}

/// Returns its first positional argument. Deployment smoke-test
/// function; real deployments register their own functions here.
struct Echo;

#[async_trait]
impl TaskFunction for Echo {
    async fn call(
        &self,
        args: Vec<Value>,
        _kwargs: serde_json::Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        Ok(args.into_iter().next().unwrap_or(Value::Null))
    }
}

/// Sleeps `ms` milliseconds, then returns it. Lets an operator exercise
/// the one-task-at-a-time loop and KILL observation latency.
struct SleepMs;

#[async_trait]
impl TaskFunction for SleepMs {
    async fn call(
        &self,
        args: Vec<Value>,
        _kwargs: serde_json::Map<String, Value>,
    ) -> Result<Value, FunctionError> {
        let ms = args
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| FunctionError::new("ArgumentError", "expected milliseconds"))?;
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        Ok(Value::from(ms))
    }
}

fn init_logging(args: &Args) -> std::io::Result<()> {
    std::fs::create_dir_all(&args.logdir)?;
    let logfile = args
        .logdir
        .join(format!("spindle_worker_{}.log", args.worker_id));
    let file = File::create(logfile)?;

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(args: Args) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let identity = WorkerIdentity::new(&args.worker_id, &args.worker_type);
    info!(
        worker_id = args.worker_id.as_str(),
        worker_type = args.worker_type.as_str(),
        "initializing worker"
    );

    let context = WorkerBuilder::new(identity)
        .register("echo", Arc::new(Echo))?
        .register("sleep_ms", Arc::new(SleepMs))?
        .build()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Abrupt termination path: log, trip the flag, exit immediately.
    // Any in-flight result is abandoned; the manager detects the
    // disconnect and reschedules.
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                error!("termination signal received; exiting now");
                let _ = shutdown_tx.send(true);
                std::process::exit(1);
            }
            Err(e) => error!(error = %e, "could not install SIGTERM handler"),
        }
    });
    #[cfg(not(unix))]
    drop(shutdown_tx);

    info!(
        address = args.address.as_str(),
        port = args.port,
        "connecting to manager"
    );
    let stream = TcpStream::connect((args.address.as_str(), args.port)).await?;

    let runtime = WorkerRuntime::new(Arc::new(context), stream, shutdown_rx);
    Ok(runtime.run().await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args) {
        eprintln!("could not set up logging in {}: {e}", args.logdir.display());
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(RunOutcome::Killed) => {
            info!("graceful shutdown after KILL");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Interrupted) => {
            error!("stopped by cancellation flag");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "worker terminated");
            ExitCode::FAILURE
        }
    }
}
