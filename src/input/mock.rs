use crate::core::event::encode_idx_payload;
use crate::core::{CameraType, EncodeIdx, Event, SegmentFiles, Which, SEGMENT_SECONDS};
use crate::input::{FrameReader, LoadOutcome, ParsedLog, Segment, SegmentLoader};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Synthetic segment loader for testing and demos without recorded data
///
/// Every segment holds an `initData` at its start followed by `carState`,
/// `can`, `roadCameraState` and `roadEncodeIdx` events at a fixed rate. All
/// payloads begin with data that lets a consumer recover the timestamp:
/// camera states carry `frame_id u32 | mono_time u64`, the others `mono_time u64`.
pub struct MockSegmentLoader {
    route_start: u64,
    hz: u64,
    invalid: HashSet<usize>,
    delays: HashMap<usize, Duration>,
    loads: Mutex<Vec<usize>>,
}

impl MockSegmentLoader {
    pub fn new(route_start: u64, hz: u64) -> Self {
        Self {
            route_start,
            hz: hz.max(1),
            invalid: HashSet::new(),
            delays: HashMap::new(),
            loads: Mutex::new(Vec::new()),
        }
    }

    /// Make a segment fail to decode
    pub fn set_invalid(&mut self, index: usize) {
        self.invalid.insert(index);
    }

    /// Delay completion of a segment's load
    pub fn set_delay(&mut self, index: usize, delay: Duration) {
        self.delays.insert(index, delay);
    }

    /// Segment indices loaded so far, in request order
    pub fn take_loads(&self) -> Vec<usize> {
        std::mem::take(&mut *self.loads.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn segment_start(&self, index: usize) -> u64 {
        self.route_start + index as u64 * SEGMENT_SECONDS * 1_000_000_000
    }

    /// Build the events a segment would hold
    pub fn generate(&self, index: usize) -> Segment {
        let start = self.segment_start(index);
        let step = 1_000_000_000 / self.hz;
        let ticks = SEGMENT_SECONDS * self.hz;

        let mut log = ParsedLog::default();
        log.push(Event::new(start, Which::InitData, start.to_le_bytes().to_vec()));

        let mut frames = Vec::with_capacity(ticks as usize);
        for tick in 0..ticks {
            let mono_time = start + tick * step;
            let frame_id = (index as u64 * ticks + tick) as u32;

            let mut camera = frame_id.to_le_bytes().to_vec();
            camera.extend_from_slice(&mono_time.to_le_bytes());
            let eidx = EncodeIdx {
                segment_num: index as u32,
                segment_offset: tick as u32,
            };

            log.push(Event::new(mono_time, Which::CarState, mono_time.to_le_bytes().to_vec()));
            log.push(Event::new(mono_time, Which::Can, mono_time.to_le_bytes().to_vec()));
            log.push(Event::new(mono_time, Which::RoadCameraState, camera));
            log.push(Event::new(mono_time, Which::RoadEncodeIdx, encode_idx_payload(frame_id, eidx)));

            frames.push(frame_id.to_le_bytes().to_vec());
        }

        Segment::new(index, log).with_frames(CameraType::Road, FrameReader::from_frames(2, 2, frames))
    }
}

/// Recover the timestamp from a payload generated by [`MockSegmentLoader`]
pub fn mock_payload_time(event: &Event) -> Option<u64> {
    let at = if event.which.camera_state().is_some() { 4 } else { 0 };
    let bytes = event.data.get(at..at + 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

#[async_trait]
impl SegmentLoader for MockSegmentLoader {
    async fn load(&self, files: SegmentFiles) -> LoadOutcome {
        let index = files.index;
        self.loads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(index);

        if let Some(delay) = self.delays.get(&index) {
            tokio::time::sleep(*delay).await;
        }

        if self.invalid.contains(&index) {
            return LoadOutcome::Invalid(format!("segment {} marked invalid", index));
        }

        LoadOutcome::Loaded(self.generate(index))
    }
}
