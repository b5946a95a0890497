//! Sliding window of resident segments
//!
//! The window keeps segments in `[current - backward, forward_end]` resident,
//! where `forward_end` is reached by walking forward from the current segment
//! until `forward` valid segments past it have been seen. Invalid segments are
//! skipped without counting; a segment still loading counts as valid, so the
//! walk never runs past it on the assumption that it will fail.

use crate::input::{LoadOutcome, Segment};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of a resident segment
#[derive(Debug, Clone)]
pub enum SegmentState {
    Loading,
    Loaded(Arc<Segment>),
    Invalid,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    state: SegmentState,
}

/// Segment that may take part in a merge
#[derive(Debug, Clone)]
pub struct Eligible {
    pub index: usize,
    pub generation: u64,
    /// `None` for an invalid segment, which contributes no events
    pub segment: Option<Arc<Segment>>,
}

/// Loads to start and segments dropped by one window update
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WindowUpdate {
    /// (segment index, load generation)
    pub to_load: Vec<(usize, u64)>,
    pub evicted: Vec<usize>,
}

/// Owner of segment lifecycles
#[derive(Debug)]
pub struct SegmentWindow {
    slots: Vec<Option<Slot>>,
    forward: usize,
    backward: usize,
    begin: usize,
    end: usize,
    next_generation: u64,
}

impl SegmentWindow {
    pub fn new(segments: usize, forward: usize, backward: usize) -> Self {
        Self {
            slots: (0..segments).map(|_| None).collect(),
            forward,
            backward,
            begin: 0,
            end: 0,
            next_generation: 0,
        }
    }

    /// Recompute the window around `current`
    ///
    /// Creates a loading slot for every segment inside the window without one and
    /// frees every resident segment outside it.
    pub fn update(&mut self, current: usize) -> WindowUpdate {
        let mut update = WindowUpdate::default();
        if self.slots.is_empty() {
            return update;
        }

        let current = current.min(self.slots.len() - 1);
        let begin = current.saturating_sub(self.backward);

        let mut end = current;
        let mut valid = 0;
        let mut i = current;
        while i < self.slots.len() && valid <= self.forward {
            self.ensure_slot(i, &mut update);
            end = i;
            if !matches!(self.state(i), Some(SegmentState::Invalid)) {
                valid += 1;
            }
            i += 1;
        }

        for i in begin..current {
            self.ensure_slot(i, &mut update);
        }

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if (i < begin || i > end) && slot.take().is_some() {
                update.evicted.push(i);
            }
        }

        self.begin = begin;
        self.end = end;
        update
    }

    fn ensure_slot(&mut self, index: usize, update: &mut WindowUpdate) {
        if self.slots[index].is_none() {
            let generation = self.next_generation;
            self.next_generation += 1;
            self.slots[index] = Some(Slot {
                generation,
                state: SegmentState::Loading,
            });
            update.to_load.push((index, generation));
        }
    }

    /// Store a finished load
    ///
    /// Returns false when the result is stale: the segment was evicted (and
    /// possibly requested again) while it was loading.
    pub fn complete(&mut self, index: usize, generation: u64, outcome: LoadOutcome) -> bool {
        let Some(slot) = self.slots.get_mut(index).and_then(Option::as_mut) else {
            debug!("segment {} evicted while loading, discarding result", index);
            return false;
        };

        if slot.generation != generation || !matches!(slot.state, SegmentState::Loading) {
            debug!("stale load of segment {} discarded", index);
            return false;
        }

        slot.state = match outcome {
            LoadOutcome::Loaded(segment) => SegmentState::Loaded(Arc::new(segment)),
            LoadOutcome::Invalid(_) => SegmentState::Invalid,
        };
        true
    }

    pub fn state(&self, index: usize) -> Option<&SegmentState> {
        self.slots.get(index)?.as_ref().map(|slot| &slot.state)
    }

    /// Indices of all resident segments
    #[cfg(test)]
    pub fn resident(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
            .collect()
    }

    /// Window bounds, inclusive
    pub fn range(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    /// The contiguous run of finished segments starting at the window's start
    ///
    /// Stops at the first segment that is still loading or not resident, so a
    /// merge never skips over data that hasn't arrived yet.
    pub fn eligible(&self) -> Vec<Eligible> {
        let mut eligible = Vec::new();
        if self.slots.is_empty() {
            return eligible;
        }

        for index in self.begin..=self.end {
            let Some(slot) = &self.slots[index] else { break };
            let segment = match &slot.state {
                SegmentState::Loading => break,
                SegmentState::Loaded(segment) => Some(Arc::clone(segment)),
                SegmentState::Invalid => None,
            };
            eligible.push(Eligible {
                index,
                generation: slot.generation,
                segment,
            });
        }
        eligible
    }
}
