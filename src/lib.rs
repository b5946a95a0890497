//! Replay of recorded vehicle logs
//!
//! A route is a sequence of one-minute segments. [`Replay`] loads a sliding
//! window of segments around the playback position, merges their events into
//! one time-ordered view and publishes them at recorded pace to a
//! [`MessageSink`], with camera frames going to an optional [`FrameSink`].

pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod output;
pub mod playback;

pub use config::ReplayConfig;
pub use self::core::{CameraType, Event, Route, SegmentFiles, Which};
pub use error::{PublishError, ReplayError};
pub use input::{FileSegmentLoader, LoadOutcome, MockSegmentLoader, Segment, SegmentLoader};
pub use output::{ChannelSink, EventFilter, FrameSink, LogSink, MessageSink, Published};
pub use playback::{Replay, ReplayState, SeekBoundary};
