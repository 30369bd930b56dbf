//! Error types for the room and cluster engines.

use gridkeep_protocol::RoomId;

/// Errors surfaced by engine-level operations that aren't expressed as a
/// `{"error": ...}` response (most engine failures are). These
/// are for conditions the surrounding room/cluster server needs to react
/// to structurally, not just relay to a client.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Asked to operate on a room the cluster has no record of, outside
    /// the normal lazy-spawn path (e.g. `shutdown_room` for an unknown id).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Spawning a new room server failed (bind error, process/task
    /// failure) before an address could be handed back to the client.
    #[error("failed to spawn room {0}: {1}")]
    SpawnFailed(RoomId, String),
}
