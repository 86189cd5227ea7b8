//! Multipart wire framing.
//!
//! A message is a set of frames, mirroring the manager's transport:
//! inbound task messages are the 3-part set `[task_id, container_id,
//! payload]`, outbound messages are `[kind, payload]`.
//!
//! Encoding on the stream:
//!
//! ```text
//! [u32 frame count] ([u32 frame length] [frame bytes])*
//! ```
//!
//! All integers big-endian. Lengths are validated before allocation.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WorkerError;

/// First frame of the registration message.
pub const REGISTER: &[u8] = b"REGISTER";

/// First frame of every task result message.
pub const TASK_RET: &[u8] = b"TASK_RET";

/// First frame of the death notice sent in response to KILL.
pub const WRKR_DIE: &[u8] = b"WRKR_DIE";

/// Inbound task_id that means "stop" instead of naming a task.
pub const KILL_SENTINEL: &str = "KILL";

/// Allocation guard for a single frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Allocation guard for frames per message. Real traffic is 2 or 3.
pub const MAX_FRAMES: usize = 8;

/// Write one multipart message.
pub async fn write_frames<W>(stream: &mut W, frames: &[&[u8]]) -> Result<(), WorkerError>
where
    W: AsyncWrite + Unpin,
{
    let count = frames.len() as u32;
    stream
        .write_all(&count.to_be_bytes())
        .await
        .map_err(|e| map_io_error(e, "writing frame count"))?;

    for frame in frames {
        let len = frame.len() as u32;
        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| map_io_error(e, "writing frame length"))?;
        stream
            .write_all(frame)
            .await
            .map_err(|e| map_io_error(e, "writing frame"))?;
    }

    stream
        .flush()
        .await
        .map_err(|e| map_io_error(e, "flushing stream"))?;

    Ok(())
}

/// Read one multipart message. Blocks until a full message arrives.
pub async fn read_frames<R>(stream: &mut R) -> Result<Vec<Vec<u8>>, WorkerError>
where
    R: AsyncRead + Unpin,
{
    let mut count_buf = [0u8; 4];
    stream
        .read_exact(&mut count_buf)
        .await
        .map_err(|e| map_io_error(e, "reading frame count"))?;
    let count = u32::from_be_bytes(count_buf) as usize;

    if count == 0 || count > MAX_FRAMES {
        return Err(WorkerError::Protocol(format!(
            "invalid frame count {count} (max {MAX_FRAMES})"
        )));
    }

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| map_io_error(e, "reading frame length"))?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > MAX_FRAME_SIZE {
            return Err(WorkerError::FrameTooLarge {
                len,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut frame = vec![0u8; len];
        stream
            .read_exact(&mut frame)
            .await
            .map_err(|e| map_io_error(e, "reading frame"))?;
        frames.push(frame);
    }

    Ok(frames)
}

/// Losing the stream mid-message is a connection failure, not a generic
/// I/O error; the supervisor treats the two the same but logs differ.
fn map_io_error(err: std::io::Error, context: &str) -> WorkerError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected => {
            WorkerError::Connection(format!("{context}: connection lost"))
        }
        _ => WorkerError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_three_part_message() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        write_frames(&mut a, &[b"t-1", b"c-1", b"payload bytes"])
            .await
            .unwrap();

        let frames = read_frames(&mut b).await.unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], b"t-1");
        assert_eq!(frames[1], b"c-1");
        assert_eq!(frames[2], b"payload bytes");
    }

    #[tokio::test]
    async fn empty_frames_are_preserved() {
        let (mut a, mut b) = tokio::io::duplex(64);

        write_frames(&mut a, &[WRKR_DIE, b""]).await.unwrap();

        let frames = read_frames(&mut b).await.unwrap();
        assert_eq!(frames, vec![WRKR_DIE.to_vec(), Vec::new()]);
    }

    #[tokio::test]
    async fn oversized_frame_length_is_rejected_before_allocation() {
        let (mut a, mut b) = tokio::io::duplex(64);

        // One frame announcing u32::MAX bytes.
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u32.to_be_bytes());
        raw.extend_from_slice(&u32::MAX.to_be_bytes());
        tokio::io::AsyncWriteExt::write_all(&mut a, &raw).await.unwrap();

        let err = read_frames(&mut b).await.unwrap_err();
        assert!(matches!(err, WorkerError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn zero_frame_count_is_a_protocol_error() {
        let (mut a, mut b) = tokio::io::duplex(64);

        tokio::io::AsyncWriteExt::write_all(&mut a, &0u32.to_be_bytes())
            .await
            .unwrap();

        let err = read_frames(&mut b).await.unwrap_err();
        assert!(matches!(err, WorkerError::Protocol(_)));
    }

    #[tokio::test]
    async fn truncated_message_reports_connection_lost() {
        let (mut a, mut b) = tokio::io::duplex(64);

        // Announce 2 frames but close after half of the first.
        let mut raw = Vec::new();
        raw.extend_from_slice(&2u32.to_be_bytes());
        raw.extend_from_slice(&10u32.to_be_bytes());
        raw.extend_from_slice(b"abc");
        tokio::io::AsyncWriteExt::write_all(&mut a, &raw).await.unwrap();
        drop(a);

        let err = read_frames(&mut b).await.unwrap_err();
        assert!(matches!(err, WorkerError::Connection(_)));
    }
}
