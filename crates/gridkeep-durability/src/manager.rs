//! The durability facade: ties the append-only log to checkpointing and
//! replay for one room.
//!
//! This is the type a room actor owns alongside its engine. It is *not*
//! constructed for the cluster engine — the cluster does not persist
//! anything, so `gridkeep::cluster_server` simply never builds one.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::checkpoint::{self, CheckpointData};
use crate::log::CommandLog;
use crate::DurabilityError;

/// Owns one room's log file and checkpoint path.
pub struct Durability {
    log: CommandLog,
    ckpt_path: PathBuf,
}

impl Durability {
    /// Opens the log at `log_path` (creating it if absent). Does not touch
    /// the checkpoint — call [`load_checkpoint`](Self::load_checkpoint)
    /// and [`replay`](Self::replay) during startup, in that order.
    pub fn open(
        log_path: impl AsRef<Path>,
        ckpt_path: impl AsRef<Path>,
    ) -> Result<Self, DurabilityError> {
        let log = CommandLog::open(log_path)?;
        Ok(Self { log, ckpt_path: ckpt_path.as_ref().to_path_buf() })
    }

    /// Loads the checkpoint, if any. Returns `None` for a missing or
    /// malformed checkpoint (already logged by [`checkpoint::load`]).
    pub fn load_checkpoint(&self) -> Result<Option<CheckpointData>, DurabilityError> {
        checkpoint::load(&self.ckpt_path)
    }

    /// Replays every log entry from the beginning, invoking `apply` for
    /// each one that parses as JSON. `apply` must dispatch straight to the
    /// engine without logging the command again, and must not re-register
    /// `broadcast_addr` bindings (those UDP endpoints are stale after a
    /// restart) — both are satisfied automatically as long as `apply` only
    /// touches engine state, never the room server's connection table.
    pub fn replay<F: FnMut(Value)>(&mut self, apply: F) -> Result<(), DurabilityError> {
        self.log.replay(apply)
    }

    /// Appends one mutating command to the log, then checkpoints if the
    /// log has grown past the threshold.
    ///
    /// `room_state`/`client_state` are only serialized if a checkpoint is
    /// actually about to be written. A checkpoint failure is logged and
    /// the log is left untouched — the next successful checkpoint will
    /// still recover the room.
    pub fn append_and_maybe_checkpoint<I: Serialize, C: Serialize>(
        &mut self,
        entry: &Value,
        room_state: impl FnOnce() -> I,
        client_state: impl FnOnce() -> C,
    ) -> Result<(), DurabilityError> {
        self.log.append(entry)?;
        if self.log.needs_checkpoint() {
            match checkpoint::write(&self.ckpt_path, &room_state(), &client_state()) {
                Ok(()) => {
                    self.log.truncate()?;
                    info!(path = %self.ckpt_path.display(), "checkpoint written, log truncated");
                }
                Err(e) => {
                    warn!(error = %e, "checkpoint write failed, retaining old checkpoint and log");
                }
            }
        }
        Ok(())
    }

    /// Current number of log entries since the last checkpoint.
    pub fn log_length(&self) -> u64 {
        self.log.length()
    }
}
