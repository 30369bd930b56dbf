//! Append-only command log.
//!
//! One line of JSON per mutating command, fsynced on every append. The
//! room server is the sole owner of the log file handle — it is never
//! shared across tasks or rooms.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::DurabilityError;

/// Checkpoints are triggered once the log holds more than this many
/// entries.
pub const CHECKPOINT_THRESHOLD: u64 = 100;

/// The append-only log for one room.
pub struct CommandLog {
    path: PathBuf,
    file: File,
    /// Number of entries appended since the last checkpoint/truncation.
    length: u64,
}

impl CommandLog {
    /// Opens (creating if absent) the log file at `path` for append-and-read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DurabilityError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| DurabilityError::io(path.clone(), e))?;
        Ok(Self { path, file, length: 0 })
    }

    /// Number of entries appended since the last checkpoint.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether the log has grown past [`CHECKPOINT_THRESHOLD`] and a
    /// checkpoint should be taken.
    pub fn needs_checkpoint(&self) -> bool {
        self.length > CHECKPOINT_THRESHOLD
    }

    /// Appends one JSON entry, then flushes and fsyncs before returning.
    pub fn append(&mut self, entry: &Value) -> Result<(), DurabilityError> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| DurabilityError::decode(self.path.clone(), e))?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        self.file
            .flush()
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        self.file
            .sync_data()
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        self.length += 1;
        Ok(())
    }

    /// Reads every entry from the beginning of the log, invoking `apply`
    /// for each one that parses. Lines that fail to parse are logged and
    /// skipped. Leaves the file positioned at EOF so
    /// subsequent [`append`](Self::append) calls continue the log.
    pub fn replay<F: FnMut(Value)>(
        &mut self,
        mut apply: F,
    ) -> Result<(), DurabilityError> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        let mut replayed = 0u64;
        {
            let mut reader = BufReader::new(&self.file);
            let mut line = String::new();
            loop {
                line.clear();
                let read = reader
                    .read_line(&mut line)
                    .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
                if read == 0 {
                    break;
                }
                let trimmed = line.trim_end_matches('\n');
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(value) => {
                        apply(value);
                        replayed += 1;
                    }
                    Err(e) => {
                        error!(path = %self.path.display(), error = %e, "failed to parse log line");
                        warn!(line = %trimmed, "dropped malformed log line during replay");
                    }
                }
            }
        }
        self.length = replayed;
        self.file
            .seek(SeekFrom::End(0))
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        Ok(())
    }

    /// Truncates the log to zero length and resets the entry counter.
    /// Called after a successful checkpoint write.
    pub fn truncate(&mut self) -> Result<(), DurabilityError> {
        self.file
            .set_len(0)
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| DurabilityError::io(self.path.clone(), e))?;
        self.length = 0;
        Ok(())
    }

    /// Reads the full log contents without applying anything; used by
    /// tests to assert on-disk state.
    #[doc(hidden)]
    pub fn read_to_string_for_test(&mut self) -> std::io::Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = String::new();
        self.file.read_to_string(&mut buf)?;
        self.file.seek(SeekFrom::End(0))?;
        Ok(buf)
    }
}

/// Serializes `value` to a [`serde_json::Value`] for appending to the log.
pub fn to_log_entry<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_increments_length_and_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CommandLog::open(dir.path().join("room.log")).unwrap();
        log.append(&json!({"method": "add_client", "client": "a"})).unwrap();
        log.append(&json!({"method": "up", "client": "a"})).unwrap();
        assert_eq!(log.length(), 2);
        assert!(!log.needs_checkpoint());
    }

    #[test]
    fn needs_checkpoint_past_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CommandLog::open(dir.path().join("room.log")).unwrap();
        for _ in 0..=CHECKPOINT_THRESHOLD {
            log.append(&json!({"method": "up", "client": "a"})).unwrap();
        }
        assert!(log.needs_checkpoint());
    }

    #[test]
    fn replay_applies_every_entry_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.log");
        {
            let mut log = CommandLog::open(&path).unwrap();
            log.append(&json!({"method": "add_client", "client": "a"})).unwrap();
            log.append(&json!({"method": "right", "client": "a"})).unwrap();
        }
        let mut log = CommandLog::open(&path).unwrap();
        let mut seen = Vec::new();
        log.replay(|entry| seen.push(entry["method"].as_str().unwrap().to_string())).unwrap();
        assert_eq!(seen, vec!["add_client".to_string(), "right".to_string()]);
        assert_eq!(log.length(), 2);
    }

    #[test]
    fn replay_skips_malformed_lines_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.log");
        std::fs::write(&path, "{\"method\": \"up\", \"client\": \"a\"}\nnot json\n").unwrap();
        let mut log = CommandLog::open(&path).unwrap();
        let mut seen = 0;
        log.replay(|_| seen += 1).unwrap();
        assert_eq!(seen, 1);
        assert_eq!(log.length(), 1);
    }

    #[test]
    fn truncate_resets_length_and_clears_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CommandLog::open(dir.path().join("room.log")).unwrap();
        log.append(&json!({"method": "up", "client": "a"})).unwrap();
        log.truncate().unwrap();
        assert_eq!(log.length(), 0);
        assert_eq!(log.read_to_string_for_test().unwrap(), "");
    }
}
