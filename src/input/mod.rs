//! Segment loading
//!
//! A [`SegmentLoader`] turns one segment locator into an immutable [`Segment`]
//! or reports it as invalid. The engine only ever sees finished results:
//! a log damaged at the tail still loads, with the events parsed before the
//! damage, and a log that can't be decoded at all becomes
//! [`LoadOutcome::Invalid`].

pub mod csv;
pub mod frames;
pub mod mock;
pub mod rlog;

pub use self::csv::parse_csv;
pub use frames::FrameReader;
pub use mock::MockSegmentLoader;
pub use rlog::{parse_rlog, write_rlog};

use crate::core::{CameraType, EncodeIdx, Event, SegmentFiles};
use crate::error::{DecodeError, SegmentTruncated};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Segment-local lookup from (camera, frame id) to the stored frame
pub type EncodeIndex = HashMap<(CameraType, u32), EncodeIdx>;

/// Output of a log parser
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub events: Vec<Event>,
    pub encode_index: EncodeIndex,
    pub truncated: Option<SegmentTruncated>,
}

impl ParsedLog {
    /// Append an event, recording it in the encode index if it carries one
    pub fn push(&mut self, event: Event) {
        if let Some((camera, frame_id, idx)) = event.encode_idx() {
            self.encode_index.insert((camera, frame_id), idx);
        }
        self.events.push(event);
    }
}

/// A fully loaded segment
///
/// Immutable once built; shared between the segment window and any merged
/// view that references it.
#[derive(Debug, Default)]
pub struct Segment {
    pub index: usize,
    /// Sorted by (timestamp, type ordinal)
    pub events: Vec<Event>,
    pub encode_index: EncodeIndex,
    pub frames: HashMap<CameraType, FrameReader>,
    pub truncated: Option<SegmentTruncated>,
}

impl Segment {
    pub fn new(index: usize, log: ParsedLog) -> Self {
        let ParsedLog {
            mut events,
            encode_index,
            truncated,
        } = log;
        // stable: equal keys keep log order
        events.sort_by_key(Event::key);

        Self {
            index,
            events,
            encode_index,
            frames: HashMap::new(),
            truncated,
        }
    }

    pub fn with_frames(mut self, camera: CameraType, reader: FrameReader) -> Self {
        self.frames.insert(camera, reader);
        self
    }

    pub fn frame(&self, camera: CameraType, offset: u32) -> Option<&[u8]> {
        self.frames.get(&camera)?.get(offset)
    }
}

/// Result of loading one segment
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Segment),
    Invalid(String),
}

/// Producer of decoded segments
///
/// Each call is independent and must not touch engine state; the engine
/// marshals the result back onto its control task.
#[async_trait]
pub trait SegmentLoader: Send + Sync {
    /// Load one segment
    async fn load(&self, files: SegmentFiles) -> LoadOutcome;
}

/// Input format detection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Rlog,
    Csv,
    Unknown,
}

/// Detect the format of a segment log by its header
pub fn detect_format(data: &[u8]) -> InputFormat {
    if data.starts_with(rlog::RLOG_MAGIC) {
        return InputFormat::Rlog;
    }

    if is_csv(data) {
        return InputFormat::Csv;
    }

    InputFormat::Unknown
}

fn is_csv(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(500)];
    match std::str::from_utf8(sample) {
        Ok(text) => text
            .lines()
            .next()
            .is_some_and(|header| header.chars().filter(|&c| c == ',').count() >= 2),
        // the sample may end mid-character
        Err(e) => e.valid_up_to() > 0 && is_csv(&sample[..e.valid_up_to()]),
    }
}

/// Parse a segment log, auto-detecting its format
pub fn parse_log(data: &[u8]) -> Result<ParsedLog, DecodeError> {
    match detect_format(data) {
        InputFormat::Rlog => parse_rlog(data),
        InputFormat::Csv => parse_csv(data),
        InputFormat::Unknown => Err(DecodeError::UnknownFormat),
    }
}

/// Load a segment from local files, blocking
pub fn load_segment(files: &SegmentFiles) -> Result<Segment, DecodeError> {
    let path = files.log.as_deref().ok_or(DecodeError::NoLog)?;
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut segment = Segment::new(files.index, parse_log(&data)?);

    for camera in CameraType::ALL {
        let Some(path) = files.camera(camera) else { continue };
        match FrameReader::open(path) {
            Ok(reader) => segment.frames.insert(camera, reader),
            Err(e) => {
                warn!("segment {}: ignoring {} camera frames: {}", files.index, camera.name(), e);
                continue;
            }
        };
    }

    Ok(segment)
}

/// Loads segments from files on local disk
#[derive(Debug, Default, Clone)]
pub struct FileSegmentLoader;

impl FileSegmentLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SegmentLoader for FileSegmentLoader {
    async fn load(&self, files: SegmentFiles) -> LoadOutcome {
        let index = files.index;
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || load_segment(&files)).await;

        match result {
            Ok(Ok(segment)) => {
                if let Some(truncated) = &segment.truncated {
                    warn!(
                        "segment {} truncated after {} events at {}: {}",
                        index, truncated.parsed, truncated.at, truncated.reason
                    );
                }
                debug!(
                    "segment {} loaded: {} events in {:?}",
                    index,
                    segment.events.len(),
                    started.elapsed()
                );
                LoadOutcome::Loaded(segment)
            }
            Ok(Err(e)) => {
                warn!("segment {} failed to decode: {}", index, e);
                LoadOutcome::Invalid(e.to_string())
            }
            Err(e) => {
                warn!("segment {} loader task failed: {}", index, e);
                LoadOutcome::Invalid(e.to_string())
            }
        }
    }
}
