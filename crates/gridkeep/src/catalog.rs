//! Catalog registration beacon.
//!
//! A fresh UDP socket per send, best-effort, failures logged and
//! swallowed rather than propagated — a beacon that fails this interval
//! tries again next interval.

use gridkeep_protocol::{CatalogBeacon, Codec, JsonCodec};
use tokio::net::UdpSocket;
use tracing::warn;

/// Sends one registration datagram to `catalog_addr`. Binds a fresh
/// ephemeral UDP socket for the send and drops it immediately after.
pub async fn send_registration(catalog_addr: &str, beacon: &CatalogBeacon) {
    if let Err(e) = try_send(catalog_addr, beacon).await {
        warn!(error = %e, catalog_addr, "catalog beacon failed");
    }
}

async fn try_send(catalog_addr: &str, beacon: &CatalogBeacon) -> Result<(), crate::GridkeepError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let payload = JsonCodec.encode(beacon)?;
    gridkeep_transport::send_beacon(&socket, catalog_addr, &payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn beacon_reaches_a_bound_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap().to_string();
        let beacon = CatalogBeacon {
            kind: "game_server".to_string(),
            owner: "me".to_string(),
            port: 9000,
            project: "gridkeep".to_string(),
        };

        send_registration(&addr, &beacon).await;

        let mut buf = [0u8; 256];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        let decoded: CatalogBeacon = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(decoded, beacon);
    }

    #[tokio::test]
    async fn a_bad_address_is_logged_and_swallowed() {
        let beacon = CatalogBeacon {
            kind: "game_server".to_string(),
            owner: "me".to_string(),
            port: 9000,
            project: "gridkeep".to_string(),
        };
        // No panic, no propagated error: this returns ().
        send_registration("not a valid address", &beacon).await;
    }
}
