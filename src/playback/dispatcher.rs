//! The stream thread
//!
//! One dedicated thread walks the current merged view in time order, sleeps
//! to match the recorded spacing of events, and hands each subscribed event
//! to the output sinks.
//!
//! All shared state sits behind one mutex and one condition variable. The
//! stream thread holds the lock while it iterates and releases it only while
//! waiting, either for new data or for the next event's due time. Writers bump
//! `updating` before taking the lock; the stream thread checks that counter
//! before every event, drops out to its wait, and so lets the writer in.
//! Because events are emitted with the lock held, a seek that has returned is
//! always observed before the next emission.
//!
//! Playback only proceeds from a view that accounts for the cursor's segment,
//! so after a seek nothing is played until the target segment is merged.

use crate::core::Event;
use crate::input::LoadOutcome;
use crate::output::{EventFilter, FrameSink, MessageSink};
use crate::playback::cursor::PlaybackCursor;
use crate::playback::merge::MergedView;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Longest pacing sleep; a larger gap plays immediately and pacing restarts from it
const MAX_SLEEP: Duration = Duration::from_secs(1);

/// Simulated seconds between progress messages
const PROGRESS_INTERVAL: f64 = 5.0;

/// Messages handled by the control task
#[derive(Debug)]
pub(crate) enum ControlMsg {
    /// Re-evaluate the segment window around the current segment
    Refresh,
    LoadFinished {
        index: usize,
        generation: u64,
        outcome: LoadOutcome,
    },
    Stop,
}

/// State guarded by the shared lock
#[derive(Debug)]
pub(crate) struct StreamState {
    pub view: Arc<MergedView>,
    pub cursor: PlaybackCursor,
    pub speed: f64,
    pub started: bool,
    pub paused: bool,
    pub stop: bool,
    /// Set by every writer, cleared by the stream thread when it re-reads state
    pub updated: bool,
}

pub(crate) struct Shared {
    state: Mutex<StreamState>,
    cv: Condvar,
    updating: AtomicUsize,
    current_segment: AtomicUsize,
    control: mpsc::UnboundedSender<ControlMsg>,
}

impl Shared {
    pub fn new(cursor: PlaybackCursor, speed: f64, control: mpsc::UnboundedSender<ControlMsg>) -> Self {
        Self {
            state: Mutex::new(StreamState {
                view: Arc::new(MergedView::empty()),
                cursor,
                speed,
                started: false,
                paused: false,
                stop: false,
                updated: false,
            }),
            cv: Condvar::new(),
            updating: AtomicUsize::new(0),
            current_segment: AtomicUsize::new(0),
            control,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutate shared state and wake the stream thread
    pub fn update<R>(&self, f: impl FnOnce(&mut StreamState) -> R) -> R {
        self.updating.fetch_add(1, Ordering::SeqCst);
        let result = {
            let mut state = self.lock();
            let result = f(&mut state);
            state.updated = true;
            self.updating.fetch_sub(1, Ordering::SeqCst);
            result
        };
        self.cv.notify_all();
        result
    }

    fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst) > 0
    }

    pub fn current_segment(&self) -> usize {
        self.current_segment.load(Ordering::SeqCst)
    }

    /// Record the segment being played; a change re-evaluates the window
    pub fn set_current_segment(&self, segment: usize) {
        if self.current_segment.swap(segment, Ordering::SeqCst) != segment {
            let _ = self.control.send(ControlMsg::Refresh);
        }
    }

    pub fn send(&self, msg: ControlMsg) {
        let _ = self.control.send(msg);
    }

    pub fn control(&self) -> mpsc::UnboundedSender<ControlMsg> {
        self.control.clone()
    }
}

/// What the stream thread does before emitting the next event
#[derive(Debug, PartialEq)]
enum Pace {
    /// Event is due, or overdue
    Now,
    Sleep(Duration),
    /// Too far ahead, e.g. right after a seek or across a gap; play it now and restart pacing
    Jump,
}

fn pace(mono_time: u64, evt_start: u64, elapsed: Duration, speed: f64) -> Pace {
    let etime = (mono_time as i128 - evt_start as i128) as f64 / speed;
    let behind = etime - elapsed.as_nanos() as f64;

    if behind <= 0.0 {
        Pace::Now
    } else if behind < MAX_SLEEP.as_nanos() as f64 {
        Pace::Sleep(Duration::from_nanos(behind as u64))
    } else {
        Pace::Jump
    }
}

pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    filter: EventFilter,
    sink: Arc<dyn MessageSink>,
    frame_sink: Option<Arc<dyn FrameSink>>,
    publish_failing: bool,
}

impl Dispatcher {
    pub fn new(
        shared: Arc<Shared>,
        filter: EventFilter,
        sink: Arc<dyn MessageSink>,
        frame_sink: Option<Arc<dyn FrameSink>>,
    ) -> Self {
        Self {
            shared,
            filter,
            sink,
            frame_sink,
            publish_failing: false,
        }
    }

    pub fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        let mut last_print = 0.0;
        let mut state = shared.lock();

        loop {
            state = shared
                .cv
                .wait_while(state, |s| !s.stop && (s.paused || !s.updated))
                .unwrap_or_else(|e| e.into_inner());
            if state.stop {
                break;
            }
            state.updated = false;

            let view = Arc::clone(&state.view);
            let segment = state.cursor.segment();
            if !view.covers(segment) {
                debug!("waiting for segment {}", segment);
                continue;
            }
            let mut i = view.find_after(state.cursor.position());
            if i >= view.len() {
                debug!("waiting for events...");
                continue;
            }

            debug!("unlogging at {} s", state.cursor.current_seconds() as u64);
            let speed = state.speed;
            let mut evt_start = state.cursor.position().mono_time;
            let mut loop_start = Instant::now();

            while i < view.len() {
                if shared.is_updating() || state.updated || state.stop {
                    break;
                }

                let event = view.event(i);
                shared.set_current_segment(state.cursor.segment_at(event.mono_time));
                if !self.filter.allows(event.which) {
                    state.cursor.advance(event);
                    i += 1;
                    continue;
                }

                let seconds = state.cursor.seconds_at(event.mono_time);
                if seconds - last_print > PROGRESS_INTERVAL || seconds < last_print {
                    last_print = seconds;
                    info!("at {} s", seconds as u64);
                }

                // keep time
                match pace(event.mono_time, evt_start, loop_start.elapsed(), speed) {
                    Pace::Sleep(delay) => {
                        state = shared
                            .cv
                            .wait_timeout_while(state, delay, |s| !s.updated && !s.stop)
                            .unwrap_or_else(|e| e.into_inner())
                            .0;
                        if state.updated || state.stop {
                            break;
                        }
                    }
                    Pace::Now => {}
                    Pace::Jump => {
                        evt_start = event.mono_time;
                        loop_start = Instant::now();
                    }
                }

                state.cursor.advance(event);
                self.emit(&view, event);
                i += 1;
            }
        }

        debug!("stream thread exiting");
    }

    fn emit(&mut self, view: &MergedView, event: &Event) {
        if let (Some(frame_sink), Some((camera, frame_id))) = (&self.frame_sink, event.camera_frame()) {
            if let Some(frame) = view.resolve_frame(camera, frame_id) {
                if let Err(e) = frame_sink.publish_frame(camera, frame_id, frame) {
                    debug!("failed to publish {} frame {}: {}", camera.name(), frame_id, e);
                }
            }
        }

        match self.sink.publish(event) {
            Ok(()) => self.publish_failing = false,
            Err(e) => {
                if !self.publish_failing {
                    warn!("failed to publish {}: {}", event.which.name(), e);
                }
                self.publish_failing = true;
            }
        }
    }
}
