//! Wire protocol for gridkeep.
//!
//! This crate defines the "language" that clients, room servers and the
//! cluster coordinator speak:
//!
//! - **Framing** ([`framing`]) — the terminator bytes every stream message
//!   ends with.
//! - **Types** ([`Request`], [`Response`], [`Snapshot`], [`CatalogBeacon`]) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during encoding and
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits below durability and the engines: it only knows
//! how to serialize and deserialize messages, never how to dispatch them.
//!
//! ```text
//! Transport (bytes) → Protocol (Request/Response) → Room/Cluster Engine
//! ```

mod codec;
mod error;
pub mod framing;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CatalogBeacon, ClientId, Position, Request, Response, RoomId, Snapshot,
};
