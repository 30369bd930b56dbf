//! Room and cluster engines for gridkeep.
//!
//! This crate is pure state: [`RoomEngine`] tracks one room's grid of
//! clients and items, [`ClusterEngine`] tracks the cluster's
//! client and room directories. Neither type knows about sockets,
//! framing, or durability — `gridkeep::room_server`/`cluster_server` wire
//! them to a connection loop, and `gridkeep-durability` wires `RoomEngine`
//! to a log and checkpoint.

mod cluster;
mod config;
mod engine;
mod error;

pub use cluster::{is_known_method as is_known_cluster_method, ClusterEngine, RoomLookup};
pub use config::{
    FIXED_CHEST_POS, FIXED_CHEST_TEMPLATE, INTERACT_FAIL_MESSAGES, INTERACT_ON_OTHER_USER,
    ItemTemplate, DIMENSION, ITEM_TEMPLATES,
};
pub use engine::{is_known_method, Item, RoomEngine};
pub use error::RoomError;
