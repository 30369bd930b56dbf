//! The cluster engine: in-memory client and room directories.
//!
//! This is pure bookkeeping — it has no notion of sockets or spawned
//! tasks. The surrounding `gridkeep::cluster_server` owns the actual
//! `tokio::spawn` handles and fills in [`ClusterEngine::bind_room`] once a
//! room server is actually listening; this engine only ever hands back
//! what it already knows or tells the caller a room needs to be spawned.

use std::collections::HashMap;

use gridkeep_protocol::{ClientId, Response, RoomId};

pub const METHODS: &[&str] = &["register_new_client", "get_room_server", "shutdown_room"];

pub fn is_known_method(method: &str) -> bool {
    METHODS.contains(&method)
}

/// What the caller should do after asking for a room's server.
pub enum RoomLookup {
    /// The room is already bound to an address.
    Existing(Response),
    /// No room server is running for this id yet; the caller must spawn
    /// one and then call [`ClusterEngine::bind_room`] with the resulting
    /// address before relaying a response to the client.
    NeedsSpawn,
}

/// The cluster's client directory and room directory. Neither map is
/// durable — a cluster restart loses both; the cluster itself keeps no
/// log or checkpoint of its own.
pub struct ClusterEngine {
    clients: HashMap<ClientId, RoomId>,
    rooms: HashMap<RoomId, String>,
}

impl ClusterEngine {
    pub fn new() -> Self {
        Self { clients: HashMap::new(), rooms: HashMap::new() }
    }

    /// Idempotent insert at room 0. A client that's already registered
    /// gets back its last known room rather than being reset.
    pub fn register_new_client(&mut self, client: ClientId) -> Response {
        let last_room = *self.clients.entry(client.clone()).or_insert(RoomId(0));
        Response::ClientRegistered { client_id: client, last_room }
    }

    /// Returns the address of an already-running room, or signals that
    /// the caller must spawn one.
    pub fn get_room_server(&self, room_id: RoomId) -> RoomLookup {
        match self.rooms.get(&room_id) {
            Some(addr) => RoomLookup::Existing(Response::RoomServer { addr: addr.clone() }),
            None => RoomLookup::NeedsSpawn,
        }
    }

    /// Records a freshly spawned room's address and returns the response
    /// to relay to the client that asked for it.
    pub fn bind_room(&mut self, room_id: RoomId, addr: String) -> Response {
        self.rooms.insert(room_id, addr.clone());
        Response::RoomServer { addr }
    }

    /// Removes a room from the directory. The completion signal itself
    /// (awaiting the spawned task, and logging a warning if it hasn't
    /// finished yet) is the caller's responsibility — that requires async
    /// machinery this pure engine doesn't have.
    pub fn remove_room(&mut self, room_id: RoomId) -> Response {
        self.rooms.remove(&room_id);
        Response::success(format!("room {room_id} has been removed"))
    }

    pub fn is_room_bound(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::new()
    }
}
