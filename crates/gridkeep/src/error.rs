//! Unified error type for the gridkeep binaries.

use gridkeep_durability::DurabilityError;
use gridkeep_protocol::ProtocolError;
use gridkeep_room::RoomError;
use gridkeep_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates a `From` impl,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GridkeepError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A durability error (log, checkpoint, replay).
    #[error(transparent)]
    Durability(#[from] DurabilityError),

    /// A room/cluster-engine error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A raw I/O error not already wrapped by one of the above (binding a
    /// listener, connecting out to the cluster).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
