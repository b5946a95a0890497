use crate::core::{Event, SEGMENT_SECONDS};
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: f64 = 1e9;
const SEGMENT_NANOS: u64 = SEGMENT_SECONDS * 1_000_000_000;

/// Whether an event exactly at a seek target is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekBoundary {
    /// Resume at the first event with `timestamp >= target`
    #[default]
    Inclusive,
    /// Resume at the first event with `timestamp > target`
    Exclusive,
}

/// Point in the merged stream that playback resumes after
///
/// Ordered against events by `(mono_time, ordinal + 1)`, so a position can sit
/// before every event of a timestamp (`tie == 0`), after all of them
/// (`tie == u32::MAX`) or right after one particular event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub mono_time: u64,
    tie: u32,
}

impl Position {
    pub fn before(mono_time: u64) -> Self {
        Self { mono_time, tie: 0 }
    }

    pub fn after_all(mono_time: u64) -> Self {
        Self { mono_time, tie: u32::MAX }
    }

    /// Position right after an event
    pub fn after(event: &Event) -> Self {
        Self {
            mono_time: event.mono_time,
            tie: event.which.ordinal() as u32 + 1,
        }
    }

    /// True when the event comes after this position
    pub fn precedes(&self, event: &Event) -> bool {
        (event.mono_time, event.which.ordinal() as u32 + 1) > (self.mono_time, self.tie)
    }
}

/// Simulated playback time within a route
///
/// Until the route start is known, times are kept relative to zero and
/// rebased once it is.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackCursor {
    route_start: Option<u64>,
    position: Position,
    segments: usize,
    boundary: SeekBoundary,
}

impl PlaybackCursor {
    pub fn new(boundary: SeekBoundary) -> Self {
        Self {
            route_start: None,
            position: Position::before(0),
            segments: 0,
            boundary,
        }
    }

    pub fn set_segment_count(&mut self, segments: usize) {
        self.segments = segments;
    }

    pub fn route_start(&self) -> Option<u64> {
        self.route_start
    }

    /// Fix the route start time, shifting a relative position onto it
    pub fn set_route_start(&mut self, start: u64) {
        if self.route_start.is_none() {
            self.position.mono_time = self.position.mono_time.saturating_add(start);
            self.route_start = Some(start);
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn total_seconds(&self) -> u64 {
        self.segments as u64 * SEGMENT_SECONDS
    }

    /// Move to `seconds` from route start, or from the current time if `relative`
    ///
    /// The target is clamped to `[0, total)`. Returns the segment containing it,
    /// or `None` when the route has no segments yet.
    pub fn seek(&mut self, seconds: f64, relative: bool) -> Option<usize> {
        if self.segments == 0 {
            return None;
        }

        let base = if relative { self.current_seconds() } else { 0.0 };
        let total_nanos = self.total_seconds() * 1_000_000_000;
        let target = ((base + seconds) * NANOS_PER_SEC).max(0.0) as u64;
        let target = target.min(total_nanos - 1);

        let mono_time = self.route_start.unwrap_or(0) + target;
        self.position = match self.boundary {
            SeekBoundary::Inclusive => Position::before(mono_time),
            SeekBoundary::Exclusive => Position::after_all(mono_time),
        };

        Some((target / SEGMENT_NANOS) as usize)
    }

    /// Record that an event has been played
    pub fn advance(&mut self, event: &Event) {
        self.position = Position::after(event);
    }

    pub fn current_seconds(&self) -> f64 {
        self.seconds_at(self.position.mono_time)
    }

    /// Seconds since route start at a log time
    pub fn seconds_at(&self, mono_time: u64) -> f64 {
        mono_time.saturating_sub(self.route_start.unwrap_or(0)) as f64 / NANOS_PER_SEC
    }

    /// Segment containing a log time
    ///
    /// Times past the end of the route belong to the last segment.
    pub fn segment_at(&self, mono_time: u64) -> usize {
        let segment = (mono_time.saturating_sub(self.route_start.unwrap_or(0)) / SEGMENT_NANOS) as usize;
        segment.min(self.segments.saturating_sub(1))
    }

    /// Segment of the current position
    pub fn segment(&self) -> usize {
        self.segment_at(self.position.mono_time)
    }
}
