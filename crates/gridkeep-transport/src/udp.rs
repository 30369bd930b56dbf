//! Unreliable datagram delivery for room snapshots and catalog beacons.
//!
//! Neither kind of datagram round-trips a response, so this module is
//! send-only from the transport layer's perspective: the room server and
//! catalog registrar each hold their own ephemeral [`UdpSocket`] and call
//! [`send_datagram`] on it.

use tokio::net::UdpSocket;

use gridkeep_protocol::framing;

use crate::TransportError;

/// Sends `payload` followed by the primary terminator to `addr`.
///
/// Room snapshots are terminated like stream messages: the snapshot wire
/// shape ends in `"END_OF_MESSAGE"` even over UDP, so both stream and
/// datagram sends can share the same serialize-and-append-terminator
/// helper.
pub async fn send_snapshot(
    socket: &UdpSocket,
    addr: &str,
    payload: &[u8],
) -> Result<(), TransportError> {
    let mut framed = Vec::with_capacity(payload.len() + framing::PRIMARY.len());
    framed.extend_from_slice(payload);
    framed.extend_from_slice(framing::PRIMARY.as_bytes());
    socket.send_to(&framed, addr).await?;
    Ok(())
}

/// Sends a catalog beacon datagram with no terminator — the catalog
/// service reads one JSON object per datagram and needs no delimiter.
pub async fn send_beacon(
    socket: &UdpSocket,
    addr: &str,
    payload: &[u8],
) -> Result<(), TransportError> {
    socket.send_to(payload, addr).await?;
    Ok(())
}
