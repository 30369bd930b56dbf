//! Durability for gridkeep rooms: append-only command log plus
//! point-in-time checkpoint.
//!
//! 1. **Log** ([`log`]) — one JSON line per mutating command, fsynced on
//!    every append.
//! 2. **Checkpoint** ([`checkpoint`]) — a snapshot of the item map and
//!    client positions, written atomically and triggering log truncation.
//! 3. **Facade** ([`Durability`]) — what a room actor actually owns: opens
//!    the log, loads the checkpoint, replays outstanding entries, and
//!    appends/checkpoints going forward.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Server (above)   ← drives append() after each mutating command
//!     ↕
//! Durability (this crate) ← log + checkpoint + replay
//!     ↕
//! Room Engine (below)    ← the state that gets replayed into
//! ```
//!
//! The cluster engine does not use this crate at all — it keeps no
//! durable state of its own.

mod checkpoint;
mod error;
mod log;
mod manager;

pub use checkpoint::CheckpointData;
pub use error::DurabilityError;
pub use log::{CommandLog, CHECKPOINT_THRESHOLD};
pub use manager::Durability;
