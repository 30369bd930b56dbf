//! The room engine: a pure state machine over a fixed-size grid of
//! clients and interactive items.
//!
//! The engine is deliberately not reentrant — callers (the room server)
//! are expected to invoke its handlers from a single scheduling context,
//! one command at a time.

use std::collections::{BTreeMap, HashMap};

use gridkeep_protocol::{ClientId, Position, Response};
use rand::seq::IndexedRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::{
    FIXED_CHEST_POS, FIXED_CHEST_TEMPLATE, INTERACT_FAIL_MESSAGES, INTERACT_ON_OTHER_USER,
    ITEM_TEMPLATES,
};

/// The methods a [`RoomEngine`] understands.
pub const METHODS: &[&str] =
    &["add_client", "up", "down", "left", "right", "interact", "get_room"];

pub fn is_known_method(method: &str) -> bool {
    METHODS.contains(&method)
}

/// One interactive item sitting on a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub uses: u32,
    pub use_message: String,
    pub empty_message: String,
    pub conflict_message: String,
    #[serde(default)]
    pub emptied_this_round: bool,
}

impl From<crate::config::ItemTemplate> for Item {
    fn from(t: crate::config::ItemTemplate) -> Self {
        Self {
            name: t.name.to_string(),
            uses: t.uses,
            use_message: t.use_message.to_string(),
            empty_message: t.empty_message.to_string(),
            conflict_message: t.conflict_message.to_string(),
            emptied_this_round: false,
        }
    }
}

/// State for one room: a grid of interactive items plus client positions.
pub struct RoomEngine {
    dimension: u32,
    room: HashMap<Position, Item>,
    clients: HashMap<ClientId, Position>,
}

impl RoomEngine {
    /// Builds a fresh room: one item template placed at a uniformly random
    /// cell, plus the fixed chest at [`FIXED_CHEST_POS`] (which overwrites
    /// the random placement if they land on the same cell).
    pub fn new(dimension: u32, rng: &mut dyn RngCore) -> Self {
        let rx = rng.next_u32() % (dimension + 1);
        let ry = rng.next_u32() % (dimension + 1);
        let template = *ITEM_TEMPLATES
            .choose(rng)
            .expect("ITEM_TEMPLATES is never empty");

        let mut room = HashMap::new();
        room.insert(Position::new(rx, ry), Item::from(template));
        room.insert(
            Position::new(FIXED_CHEST_POS.0, FIXED_CHEST_POS.1),
            Item::from(FIXED_CHEST_TEMPLATE),
        );

        Self { dimension, room, clients: HashMap::new() }
    }

    fn center(&self) -> Position {
        Position::new(self.dimension / 2, self.dimension / 2)
    }

    /// Idempotent insert at the room's center. Reconnecting clients find
    /// themselves exactly where they left off, since the engine never
    /// removes a client on its own (the room server drops the position
    /// only when the connection itself is lost).
    pub fn add_client(&mut self, client: ClientId) -> Response {
        if let Some(pos) = self.clients.get(&client) {
            return Response::ClientAdded { client_id: client, pos: *pos };
        }
        let pos = self.center();
        self.clients.insert(client.clone(), pos);
        Response::ClientAdded { client_id: client, pos }
    }

    fn clamp(&self, value: i64) -> u32 {
        value.clamp(0, self.dimension as i64) as u32
    }

    /// Moves `client` by `(dx, dy)`, clamping to the board. Returns
    /// `Some(exited)` where `exited` is true only when the attempted
    /// *horizontal* coordinate fell outside the board — vertical clamping
    /// never signals an exit. Returns `None` if the client isn't in the
    /// room.
    fn try_move(&mut self, client: &ClientId, dx: i64, dy: i64) -> Option<bool> {
        let pos = *self.clients.get(client)?;
        let desired_x = pos.x as i64 + dx;
        let desired_y = pos.y as i64 + dy;
        let new_x = self.clamp(desired_x);
        let new_y = self.clamp(desired_y);
        self.clients.insert(client.clone(), Position::new(new_x, new_y));
        Some(desired_x != new_x as i64)
    }

    pub fn up(&mut self, client: ClientId) -> Response {
        match self.try_move(&client, 0, 1) {
            Some(_) => Response::success("move up"),
            None => Response::error("client not in room"),
        }
    }

    pub fn down(&mut self, client: ClientId) -> Response {
        match self.try_move(&client, 0, -1) {
            Some(_) => Response::success("move down"),
            None => Response::error("client not in room"),
        }
    }

    pub fn left(&mut self, client: ClientId) -> Response {
        match self.try_move(&client, -1, 0) {
            Some(true) => Response::success("exit left"),
            Some(false) => Response::success("move left"),
            None => Response::error("client not in room"),
        }
    }

    pub fn right(&mut self, client: ClientId) -> Response {
        match self.try_move(&client, 1, 0) {
            Some(true) => Response::success("exit right"),
            Some(false) => Response::success("move right"),
            None => Response::error("client not in room"),
        }
    }

    /// Never fails — a client with no recorded position (shouldn't happen
    /// past `add_client`) is treated as colliding with nobody.
    pub fn interact(&mut self, client: ClientId, rng: &mut dyn RngCore) -> Response {
        let Some(&pos) = self.clients.get(&client) else {
            let msg = INTERACT_FAIL_MESSAGES
                .choose(rng)
                .expect("INTERACT_FAIL_MESSAGES is never empty");
            return Response::Interact { msg: msg.to_string() };
        };

        if let Some(item) = self.room.get_mut(&pos) {
            let msg = if item.emptied_this_round {
                item.conflict_message.clone()
            } else if item.uses == 0 {
                item.empty_message.clone()
            } else {
                item.uses -= 1;
                let msg = item.use_message.clone();
                if item.uses == 0 {
                    item.emptied_this_round = true;
                }
                msg
            };
            return Response::Interact { msg };
        }

        let mut others: Vec<&str> = self
            .clients
            .iter()
            .filter(|(c, p)| **c != client && **p == pos)
            .map(|(c, _)| c.as_str())
            .collect();
        others.sort_unstable();

        let msg = if others.is_empty() {
            INTERACT_FAIL_MESSAGES
                .choose(rng)
                .expect("INTERACT_FAIL_MESSAGES is never empty")
                .to_string()
        } else {
            let joined = join_with_grammar(&others);
            let template = INTERACT_ON_OTHER_USER
                .choose(rng)
                .expect("INTERACT_ON_OTHER_USER is never empty");
            template.replace("{collided_users}", &joined)
        };
        Response::Interact { msg }
    }

    /// End-of-tick hook: clears every item's `emptied_this_round` flag.
    pub fn clear_empty_markers(&mut self) {
        for item in self.room.values_mut() {
            item.emptied_this_round = false;
        }
    }

    /// Read-only snapshot merging item names with the positions of
    /// currently-connected clients. `alive` should contain only clients
    /// the room server still has a live connection for, so a client that
    /// disconnected without sending a final command doesn't linger in
    /// every broadcast (the engine itself keeps their position until the
    /// connection is explicitly dropped).
    pub fn get_room(&self, alive: &HashMap<ClientId, Position>) -> Response {
        Response::Room { room: self.merged_room_map(alive) }
    }

    /// Same merge `get_room` performs, reusable by the snapshot broadcast
    /// path which needs the identical map shape for UDP snapshots.
    pub fn merged_room_map(&self, alive: &HashMap<ClientId, Position>) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> =
            self.room.iter().map(|(pos, item)| (item.name.clone(), pos.to_string())).collect();
        for (client, pos) in alive {
            merged.insert(client.to_string(), pos.to_string());
        }
        merged
    }

    /// All client positions, keyed by id — used by the room server to
    /// build the `alive` map passed to `get_room`/broadcasts and to
    /// serialize checkpoints.
    pub fn client_positions(&self) -> &HashMap<ClientId, Position> {
        &self.clients
    }

    pub fn position_of(&self, client: &ClientId) -> Option<Position> {
        self.clients.get(client).copied()
    }

    /// Checkpoint serialization: item map keyed by `"x:y"` position string.
    pub fn checkpoint_items(&self) -> BTreeMap<String, Item> {
        self.room.iter().map(|(pos, item)| (pos.to_string(), item.clone())).collect()
    }

    /// Checkpoint serialization: client map keyed by client id, valued by
    /// a raw `"x:y"` position string rather than a nested object.
    pub fn checkpoint_clients(&self) -> BTreeMap<String, String> {
        self.clients.iter().map(|(c, pos)| (c.to_string(), pos.to_string())).collect()
    }

    /// Applies a checkpoint's item map if it decodes to a non-empty
    /// object; malformed or empty maps are ignored and the freshly
    /// constructed random room stands.
    pub fn apply_checkpoint_items(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else {
            return;
        };
        if obj.is_empty() {
            return;
        }
        let mut room = HashMap::with_capacity(obj.len());
        for (key, val) in obj {
            let Ok(pos) = key.parse::<Position>() else {
                warn!(key, "checkpoint item key is not a valid position, ignoring checkpoint room");
                return;
            };
            let Ok(item) = serde_json::from_value::<Item>(val.clone()) else {
                warn!(key, "checkpoint item value malformed, ignoring checkpoint room");
                return;
            };
            room.insert(pos, item);
        }
        self.room = room;
    }

    /// Applies a checkpoint's client map if it decodes to a non-empty
    /// object.
    pub fn apply_checkpoint_clients(&mut self, value: &Value) {
        let Some(obj) = value.as_object() else {
            return;
        };
        if obj.is_empty() {
            return;
        }
        let mut clients = HashMap::with_capacity(obj.len());
        for (key, val) in obj {
            let Some(pos_str) = val.as_str() else {
                warn!(key, "checkpoint client position is not a string, ignoring checkpoint clients");
                return;
            };
            let Ok(pos) = pos_str.parse::<Position>() else {
                warn!(key, pos_str, "checkpoint client position malformed, ignoring checkpoint clients");
                return;
            };
            clients.insert(ClientId::from(key.as_str()), pos);
        }
        self.clients = clients;
    }
}

/// Grammar-correct join of colliding client names: one name bare, two
/// space-joined with the second prefixed by `and `, three or more
/// comma-joined with `and ` before the last.
fn join_with_grammar(names: &[&str]) -> String {
    match names.len() {
        0 => String::new(),
        1 => names[0].to_string(),
        2 => format!("{} and {}", names[0], names[1]),
        _ => {
            let (last, rest) = names.split_last().expect("checked len >= 3 above");
            format!("{}, and {}", rest.join(", "), last)
        }
    }
}
