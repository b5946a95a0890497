//! Globally time-ordered view over the eligible segments
//!
//! A [`MergedView`] never copies events. It holds shared handles to the
//! segments it was built from plus `(segment, offset)` references in merge
//! order, so a segment evicted from the window stays alive for as long as any
//! view still points into it.

use crate::core::{CameraType, EncodeIdx, Event, Which, SEGMENT_SECONDS};
use crate::input::{EncodeIndex, Segment};
use crate::playback::cursor::Position;
use crate::playback::window::Eligible;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventRef {
    segment: u32,
    offset: u32,
}

/// Immutable merge of several segments' events
#[derive(Debug, Default)]
pub struct MergedView {
    segments: Vec<Arc<Segment>>,
    events: Vec<EventRef>,
    encode_index: EncodeIndex,
    /// Segments accounted for, including invalid ones that contribute nothing
    covered: Vec<usize>,
}

impl MergedView {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stable k-way merge of already sorted segments
    ///
    /// Events with equal `(timestamp, type ordinal)` keep the order of the
    /// segments they came from, then their order within the segment.
    pub fn build(segments: Vec<Arc<Segment>>) -> Self {
        let total = segments.iter().map(|s| s.events.len()).sum();
        let mut events = Vec::with_capacity(total);

        let mut heap = BinaryHeap::with_capacity(segments.len());
        for (seg, segment) in segments.iter().enumerate() {
            if let Some(first) = segment.events.first() {
                heap.push(Reverse((first.key(), seg, 0usize)));
            }
        }

        while let Some(Reverse((_, seg, offset))) = heap.pop() {
            events.push(EventRef {
                segment: seg as u32,
                offset: offset as u32,
            });
            if let Some(next) = segments[seg].events.get(offset + 1) {
                heap.push(Reverse((next.key(), seg, offset + 1)));
            }
        }

        let mut encode_index = EncodeIndex::new();
        for segment in &segments {
            encode_index.extend(segment.encode_index.iter().map(|(k, v)| (*k, *v)));
        }

        let covered = segments.iter().map(|s| s.index).collect();
        Self {
            segments,
            events,
            encode_index,
            covered,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event(&self, i: usize) -> &Event {
        let r = self.events[i];
        &self.segments[r.segment as usize].events[r.offset as usize]
    }

    /// Index of the segment an event came from
    #[cfg(test)]
    pub fn segment_of(&self, i: usize) -> usize {
        self.segments[self.events[i].segment as usize].index
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        (0..self.len()).map(move |i| self.event(i))
    }

    /// Indices of the segments contributing to this view
    pub fn segment_indices(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.index).collect()
    }

    /// Whether playback of a segment can proceed from this view
    pub fn covers(&self, segment: usize) -> bool {
        self.covered.contains(&segment)
    }

    /// First event after a position, or `len()` if there is none
    pub fn find_after(&self, position: Position) -> usize {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if position.precedes(self.event(mid)) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    pub fn encode_idx(&self, camera: CameraType, frame_id: u32) -> Option<EncodeIdx> {
        self.encode_index.get(&(camera, frame_id)).copied()
    }

    /// Look up a camera frame through the encode index
    ///
    /// Only resolves while the segment holding the frame is part of this view.
    pub fn resolve_frame(&self, camera: CameraType, frame_id: u32) -> Option<&[u8]> {
        let idx = self.encode_idx(camera, frame_id)?;
        self.segments
            .iter()
            .find(|s| s.index == idx.segment_num as usize)?
            .frame(camera, idx.segment_offset)
    }

    /// Route start time implied by this view
    ///
    /// Taken from the first `initData`; when the view doesn't begin at segment 0
    /// it is projected back by the segment's offset in the route.
    pub fn route_start(&self) -> Option<u64> {
        let first = self.segments.iter().find(|s| !s.events.is_empty())?;
        let anchor = first
            .events
            .iter()
            .find(|e| e.which == Which::InitData)
            .unwrap_or(&first.events[0]);
        let offset = first.index as u64 * SEGMENT_SECONDS * 1_000_000_000;
        Some(anchor.mono_time.saturating_sub(offset))
    }
}

/// Rebuilds the merged view when the eligible segments change
#[derive(Debug, Default)]
pub struct EventMerger {
    merged: Vec<(usize, u64)>,
}

impl EventMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new view if the eligible set differs from the last one merged
    ///
    /// Identity is (segment index, load generation), so a segment reloaded
    /// after eviction counts as a change.
    pub fn rebuild(&mut self, eligible: &[Eligible]) -> Option<MergedView> {
        let identity: Vec<(usize, u64)> = eligible.iter().map(|e| (e.index, e.generation)).collect();
        if identity == self.merged {
            return None;
        }

        debug!(
            "merge segments {:?}",
            eligible.iter().map(|e| e.index).collect::<Vec<_>>()
        );
        self.merged = identity;

        let segments = eligible.iter().filter_map(|e| e.segment.clone()).collect();
        let mut view = MergedView::build(segments);
        view.covered = eligible.iter().map(|e| e.index).collect();
        Some(view)
    }

    /// Segments in the current merge
    pub fn merged(&self) -> Vec<usize> {
        self.merged.iter().map(|(i, _)| *i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{encode_idx_payload, is_sorted};
    use crate::input::{FrameReader, MockSegmentLoader, ParsedLog};

    fn segment(index: usize, events: &[(u64, Which)]) -> Arc<Segment> {
        let mut log = ParsedLog::default();
        for (n, (t, which)) in events.iter().enumerate() {
            log.push(Event::new(*t, *which, vec![index as u8, n as u8]));
        }
        Arc::new(Segment::new(index, log))
    }

    fn eligible(segments: &[Arc<Segment>]) -> Vec<Eligible> {
        segments
            .iter()
            .map(|s| Eligible {
                index: s.index,
                generation: s.index as u64,
                segment: Some(Arc::clone(s)),
            })
            .collect()
    }

    #[test]
    fn test_merge_is_sorted_and_complete() {
        let a = segment(0, &[(1, Which::Can), (5, Which::CarState), (9, Which::Can)]);
        let b = segment(1, &[(2, Which::Can), (5, Which::Can), (5, Which::CarState)]);
        let view = MergedView::build(vec![a, b]);

        let events: Vec<Event> = view.iter().cloned().collect();
        assert_eq!(events.len(), 6);
        assert!(is_sorted(&events));

        let keys: Vec<(u64, u16)> = events.iter().map(Event::key).collect();
        assert_eq!(
            keys,
            vec![(1, 2), (2, 2), (5, 2), (5, 4), (5, 4), (9, 2)]
        );
        // equal keys: earlier segment first
        assert_eq!(events[3].data, vec![0, 1]);
        assert_eq!(events[4].data, vec![1, 2]);
        assert_eq!(view.segment_of(4), 1);
    }

    #[test]
    fn test_merge_matches_sorted_concatenation() {
        let loader = MockSegmentLoader::new(0, 5);
        let segments: Vec<Arc<Segment>> = (0..3).map(|i| Arc::new(loader.generate(i))).collect();

        let view = MergedView::build(segments.clone());
        let mut expected: Vec<Event> = segments.iter().flat_map(|s| s.events.clone()).collect();
        expected.sort_by_key(Event::key);

        assert_eq!(view.iter().cloned().collect::<Vec<_>>(), expected);
        assert_eq!(view.segment_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_find_after() {
        let view = MergedView::build(vec![segment(
            0,
            &[(10, Which::Can), (10, Which::CarState), (20, Which::Can)],
        )]);

        assert_eq!(view.find_after(Position::before(0)), 0);
        assert_eq!(view.find_after(Position::before(10)), 0);
        assert_eq!(view.find_after(Position::after(view.event(0))), 1);
        assert_eq!(view.find_after(Position::after_all(10)), 2);
        assert_eq!(view.find_after(Position::before(21)), 3);
        assert_eq!(MergedView::empty().find_after(Position::before(0)), 0);
    }

    #[test]
    fn test_rebuild_only_on_identity_change() {
        let a = segment(0, &[(1, Which::Can)]);
        let b = segment(1, &[(2, Which::Can)]);
        let mut merger = EventMerger::new();

        assert!(merger.rebuild(&eligible(&[a.clone()])).is_some());
        assert!(merger.rebuild(&eligible(&[a.clone()])).is_none());

        let view = merger.rebuild(&eligible(&[a.clone(), b.clone()])).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(merger.merged(), vec![0, 1]);

        let mut reloaded = eligible(&[a, b]);
        reloaded[1].generation = 99;
        assert!(merger.rebuild(&reloaded).is_some());
    }

    #[test]
    fn test_invalid_segment_contributes_nothing() {
        let a = segment(0, &[(1, Which::Can)]);
        let c = segment(2, &[(3, Which::Can)]);
        let mut list = eligible(&[a, c]);
        list.insert(
            1,
            Eligible {
                index: 1,
                generation: 7,
                segment: None,
            },
        );

        let view = EventMerger::new().rebuild(&list).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.segment_indices(), vec![0, 2]);
        assert!(view.covers(1));
        assert!(!view.covers(3));
    }

    #[test]
    fn test_resolve_frame_and_route_start() {
        let mut log = ParsedLog::default();
        log.push(Event::new(60_000_000_500, Which::InitData, vec![]));
        log.push(Event::new(
            60_000_000_600,
            Which::RoadEncodeIdx,
            encode_idx_payload(4, EncodeIdx { segment_num: 1, segment_offset: 1 }),
        ));
        let seg = Segment::new(1, log)
            .with_frames(CameraType::Road, FrameReader::from_frames(1, 1, vec![vec![0], vec![7]]));
        let view = MergedView::build(vec![Arc::new(seg)]);

        assert_eq!(view.resolve_frame(CameraType::Road, 4), Some(&[7u8][..]));
        assert_eq!(view.resolve_frame(CameraType::Road, 5), None);
        assert_eq!(view.resolve_frame(CameraType::Driver, 4), None);
        assert_eq!(view.route_start(), Some(500));
        assert_eq!(MergedView::empty().route_start(), None);
    }
}
