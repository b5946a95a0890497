//! Error types for the replay engine
//!
//! Only [`ReplayError::RouteLoad`] is fatal, and only to `Replay::start`.
//! Everything that goes wrong after the engine is running is reduced to state:
//! a segment that fails to decode becomes `Invalid`, a truncated segment keeps
//! the events parsed before the damage, and a failed publish is logged and
//! dropped by the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the public replay API
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to load route {route}: {reason}")]
    RouteLoad { route: String, reason: String },

    #[error("invalid route name: {0}")]
    InvalidRouteName(String),

    #[error("replay already started")]
    AlreadyStarted,

    #[error("replay has been stopped")]
    Stopped,

    #[error("failed to spawn stream thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors produced while decoding a single segment
///
/// These never leave the loader: the loader turns them into `LoadOutcome::Invalid`
/// or, for damage at the tail of a log, into a truncated but loaded segment.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown log format")]
    UnknownFormat,

    #[error("bad magic in {0}")]
    BadMagic(&'static str),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column, expected one of {0:?}")]
    MissingColumn(&'static [&'static str]),

    #[error("segment has no log file")]
    NoLog,
}

/// Where decoding of a segment log stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTruncated {
    /// Number of records fully parsed before the damage
    pub parsed: usize,
    /// Byte offset (binary) or row number (csv) where parsing stopped
    pub at: usize,
    pub reason: String,
}

/// Failure reported by an output sink
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("sink closed")]
    Closed,

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
