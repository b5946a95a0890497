pub mod cursor;
pub mod dispatcher;
pub mod engine;
pub mod merge;
pub mod window;

pub use cursor::{PlaybackCursor, Position, SeekBoundary};
pub use engine::Replay;
pub use merge::{EventMerger, MergedView};
pub use window::{SegmentState, SegmentWindow};

/// Replay lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Not started yet
    Idle,
    /// Started, no merged events available yet
    Loading,
    Playing,
    Paused,
    /// Terminal
    Stopped,
}

/// Playback speed bounds
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;
