//! # gridkeep
//!
//! Cluster coordinator and room server binaries for a distributed grid
//! game service.
//!
//! A [`cluster_server`] accepts clients, assigns them to rooms, and spawns
//! [`room_server`] processes on demand; each room server owns one
//! [`gridkeep_room::RoomEngine`], replays its durable log on startup via
//! [`gridkeep_durability::Durability`], and answers client commands over a
//! framed TCP stream (`gridkeep_transport`, `gridkeep_protocol`).

pub mod catalog;
pub mod cluster_server;
pub mod config;
mod error;
pub mod room_server;

pub use error::GridkeepError;
