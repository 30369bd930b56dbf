//! Transport layer for gridkeep: terminator-delimited TCP stream framing
//! plus unreliable UDP datagrams.
//!
//! There is no transport abstraction trait here on purpose — every caller
//! in this workspace talks to exactly one kind of stream (`TcpStream`) and
//! one kind of datagram (`UdpSocket`), so a `Transport`/`Connection` trait
//! pair would stand between the room server and the one implementation it
//! will ever use. [`tcp`] and [`udp`] are plain functions over
//! `tokio::net` types instead.

pub mod tcp;
pub mod udp;

mod error;

pub use error::TransportError;
pub use tcp::{read_message, write_message, DEFAULT_RECEIVE_TIMEOUT};
pub use udp::{send_beacon, send_snapshot};
