//! Point-in-time checkpoint of a room's item map and client positions.
//!
//! A checkpoint is two JSON lines on disk: the item map, then the
//! client-position map. Writes go to a `.new` sibling file and are
//! atomically renamed into place so a crash mid-write never corrupts the
//! previous checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::DurabilityError;

/// The two maps recovered from a checkpoint file, still as raw JSON so the
/// caller can decide whether each one is non-empty before overwriting the
/// freshly-constructed engine state.
#[derive(Debug, Clone, Default)]
pub struct CheckpointData {
    pub items: Value,
    pub clients: Value,
}

/// Loads a checkpoint from `path`, returning `None` if no checkpoint file
/// exists or it is malformed (wrong line count, unparseable JSON). A
/// malformed checkpoint is logged and otherwise ignored — the room's
/// freshly-initialized random state stands.
pub fn load(path: impl AsRef<Path>) -> Result<Option<CheckpointData>, DurabilityError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DurabilityError::io(path.to_path_buf(), e)),
    };

    let mut lines = contents.lines();
    let room_line = lines.next();
    let clients_line = lines.next();
    let extra = lines.next();

    let (Some(room_line), Some(clients_line), None) = (room_line, clients_line, extra) else {
        warn!(path = %path.display(), "malformed checkpoint (expected exactly two lines), ignoring");
        return Ok(None);
    };

    let items = match serde_json::from_str::<Value>(room_line) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed checkpoint item map, ignoring");
            return Ok(None);
        }
    };
    let clients = match serde_json::from_str::<Value>(clients_line) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed checkpoint client map, ignoring");
            return Ok(None);
        }
    };

    Ok(Some(CheckpointData { items, clients }))
}

/// Writes a fresh checkpoint: both maps to `path.new`, then renames over
/// `path`. Returns an error without touching the existing checkpoint if
/// anything along the way fails.
pub fn write<I: Serialize, C: Serialize>(
    path: impl AsRef<Path>,
    items: &I,
    clients: &C,
) -> Result<(), DurabilityError> {
    let path = path.as_ref();
    let tmp_path = tmp_path(path);

    let items_json = serde_json::to_string(items)
        .map_err(|e| DurabilityError::decode(path.to_path_buf(), e))?;
    let clients_json = serde_json::to_string(clients)
        .map_err(|e| DurabilityError::decode(path.to_path_buf(), e))?;

    let body = format!("{items_json}\n{clients_json}\n");
    fs::write(&tmp_path, body).map_err(|e| DurabilityError::io(tmp_path.clone(), e))?;
    fs::rename(&tmp_path, path).map_err(|e| DurabilityError::io(path.to_path_buf(), e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".new");
    PathBuf::from(name)
}
