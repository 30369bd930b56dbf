//! Error types for the durability layer.

use std::path::PathBuf;

/// Errors that can occur while appending, checkpointing, or replaying a
/// room's durable state.
#[derive(Debug, thiserror::Error)]
pub enum DurabilityError {
    /// Opening, writing, fsyncing, or renaming a log/checkpoint file failed.
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A checkpoint or log line could not be parsed as JSON.
    ///
    /// Per the durability contract this is never fatal on its own — the
    /// caller logs it and carries on (checkpoint ignored, log line
    /// skipped); it's surfaced as an error so call sites can choose to do
    /// that logging themselves.
    #[error("failed to parse json at {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DurabilityError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn decode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Decode { path: path.into(), source }
    }
}
