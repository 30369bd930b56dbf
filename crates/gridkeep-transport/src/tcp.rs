//! Terminator-delimited framing over a TCP stream.
//!
//! There is no length prefix: a receiver keeps reading until its
//! accumulated buffer ends with [`gridkeep_protocol::framing::PRIMARY`]
//! or `ALTERNATE`, strips the terminator, and hands back whatever's left.

use std::time::Duration;

use gridkeep_protocol::framing;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::TransportError;

/// Default bound on the receive timeout.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// A generous ceiling on a single frame, well past anything this
/// protocol's JSON messages reach; guards against a misbehaving peer
/// that never sends a terminator.
const MAX_FRAME_BYTES: usize = 1 << 20;

/// Reads one terminator-delimited message from `stream`.
///
/// Returns `Ok(None)` if the peer closes the connection cleanly before
/// any bytes arrive (an idle connection going away, not an error).
/// Returns [`TransportError::ConnectionClosed`] if the peer closes mid-
/// message. Returns [`TransportError::Timeout`] if no terminator shows up
/// within `timeout`.
pub async fn read_message<S>(
    stream: &mut S,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    time::timeout(timeout, async {
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                if buf.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed);
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > MAX_FRAME_BYTES {
                return Err(TransportError::FrameTooLarge(MAX_FRAME_BYTES));
            }
            if let Some(payload) = framing::strip_terminator(&buf) {
                return Ok(Some(payload.to_vec()));
            }
        }
    })
    .await
    .map_err(|_| TransportError::Timeout)?
}

/// Writes `payload` followed by the primary terminator.
pub async fn write_message<S>(stream: &mut S, payload: &[u8]) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(payload).await?;
    stream.write_all(framing::PRIMARY.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
