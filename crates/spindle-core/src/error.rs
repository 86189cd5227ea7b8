use thiserror::Error;

/// Process-fatal error for the worker.
///
/// Everything here terminates the worker with a non-zero exit status.
/// User-code failures never appear in this enum; they are captured into
/// a `ResultMessage` and reported back to the manager (see `executor`).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Malformed wire traffic where no task identity can be recovered,
    /// so there is nothing to report an error against.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The manager connection failed or was closed.
    #[error("connection error: {0}")]
    Connection(String),

    /// An inbound frame announced a length above the allocation guard.
    #[error("frame too large: {len} bytes (max {max} bytes)")]
    FrameTooLarge { len: usize, max: usize },

    /// Encoding an outbound message failed. Does not happen for
    /// well-formed messages; kept as an error instead of a panic.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A function name was registered twice during startup.
    #[error("duplicate function registration for '{0}'")]
    DuplicateFunction(String),
}
