use crate::config::ReplayConfig;
use crate::core::{Event, Route};
use crate::error::ReplayError;
use crate::input::{LoadOutcome, SegmentLoader};
use crate::output::{EventFilter, FrameSink, MessageSink};
use crate::playback::cursor::PlaybackCursor;
use crate::playback::dispatcher::{ControlMsg, Dispatcher, Shared};
use crate::playback::merge::EventMerger;
use crate::playback::window::SegmentWindow;
use crate::playback::{ReplayState, MAX_SPEED, MIN_SPEED};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Replays a recorded route
///
/// Segments are loaded on the given tokio runtime as playback moves through
/// the route; a dedicated thread publishes the merged events in time order.
/// Every method takes `&self`, so a `Replay` can be shared across threads.
pub struct Replay {
    route: Mutex<Route>,
    config: ReplayConfig,
    filter: EventFilter,
    loader: Arc<dyn SegmentLoader>,
    sink: Arc<dyn MessageSink>,
    frame_sink: Option<Arc<dyn FrameSink>>,
    runtime: Handle,
    shared: Arc<Shared>,
    control_rx: Mutex<Option<mpsc::UnboundedReceiver<ControlMsg>>>,
    stream_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Replay {
    pub fn new(
        route: Route,
        config: ReplayConfig,
        loader: Arc<dyn SegmentLoader>,
        sink: Arc<dyn MessageSink>,
        runtime: Handle,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cursor = PlaybackCursor::new(config.seek_boundary);
        let speed = config.speed.clamp(MIN_SPEED, MAX_SPEED);
        let filter = EventFilter::new(&config.allow, &config.block);

        Self {
            route: Mutex::new(route),
            config,
            filter,
            loader,
            sink,
            frame_sink: None,
            runtime,
            shared: Arc::new(Shared::new(cursor, speed, control_tx)),
            control_rx: Mutex::new(Some(control_rx)),
            stream_thread: Mutex::new(None),
        }
    }

    /// Also publish camera frames for camera state events
    pub fn with_frame_sink(mut self, sink: Arc<dyn FrameSink>) -> Self {
        self.frame_sink = Some(sink);
        self
    }

    /// Load the route and begin playback
    ///
    /// Fails without spawning anything when the route can't be loaded.
    pub fn start(&self) -> Result<(), ReplayError> {
        if self.shared.lock().stop {
            return Err(ReplayError::Stopped);
        }
        let mut control_rx = self.control_rx.lock().unwrap_or_else(|e| e.into_inner());
        if control_rx.is_none() {
            return Err(ReplayError::AlreadyStarted);
        }

        let route = {
            let mut route = self.route.lock().unwrap_or_else(|e| e.into_inner());
            route.load()?;
            Arc::new(route.clone())
        };

        self.shared.update(|s| {
            s.cursor.set_segment_count(route.len());
            s.started = true;
        });
        self.seek_to(self.config.start_seconds, false);

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.shared),
            self.filter.clone(),
            Arc::clone(&self.sink),
            self.frame_sink.clone(),
        );
        let handle = thread::Builder::new()
            .name("replay-stream".to_string())
            .spawn(move || dispatcher.run())?;
        *self.stream_thread.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        let controller = Controller {
            window: SegmentWindow::new(
                route.len(),
                self.config.forward_segments,
                self.config.backward_segments,
            ),
            merger: EventMerger::new(),
            loader: Arc::clone(&self.loader),
            shared: Arc::clone(&self.shared),
            route: Arc::clone(&route),
        };
        if let Some(rx) = control_rx.take() {
            self.runtime.spawn(controller.run(rx));
        }
        self.shared.send(ControlMsg::Refresh);

        if let Some(recorded) = route.name().start_time() {
            debug!("route recorded {}", recorded.format("%Y-%m-%d %H:%M:%S"));
        }
        info!(
            "replaying {} ({} segments, {} services) at {}x",
            route.name(),
            route.len(),
            self.filter.names().len(),
            self.speed()
        );
        Ok(())
    }

    /// Seek to `seconds` from route start, or from the current time if `relative`
    pub fn seek_to(&self, seconds: f64, relative: bool) {
        self.shared.update(|s| {
            if let Some(segment) = s.cursor.seek(seconds, relative) {
                info!("seeking to {:.1} s (segment {})", s.cursor.current_seconds(), segment);
                self.shared.set_current_segment(segment);
            }
        });
    }

    pub fn pause(&self, pause: bool) {
        self.shared.update(|s| {
            if s.paused != pause {
                info!("{} at {:.1} s", if pause { "paused" } else { "resuming" }, s.cursor.current_seconds());
            }
            s.paused = pause;
        });
    }

    /// Set playback speed, clamped to 0.1 to 10
    pub fn set_speed(&self, speed: f64) {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.shared.update(|s| s.speed = speed);
    }

    /// Stop playback and wait for the stream thread to exit
    ///
    /// Terminal: a stopped replay can't be restarted.
    pub fn stop(&self) {
        let stopped = self.shared.update(|s| std::mem::replace(&mut s.stop, true));
        if !stopped {
            debug!("stopping replay");
        }
        self.shared.send(ControlMsg::Stop);

        let handle = self.stream_thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("stream thread panicked");
            }
        }
    }

    pub fn state(&self) -> ReplayState {
        let s = self.shared.lock();
        if s.stop {
            ReplayState::Stopped
        } else if !s.started {
            ReplayState::Idle
        } else if s.view.is_empty() {
            ReplayState::Loading
        } else if s.paused {
            ReplayState::Paused
        } else {
            ReplayState::Playing
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn speed(&self) -> f64 {
        self.shared.lock().speed
    }

    /// Seconds since route start of the last published event, or of the seek target
    pub fn current_seconds(&self) -> f64 {
        self.shared.lock().cursor.current_seconds()
    }

    pub fn total_seconds(&self) -> u64 {
        self.shared.lock().cursor.total_seconds()
    }

    pub fn current_segment(&self) -> usize {
        self.shared.current_segment()
    }

    /// Route start time, once the first segment has been merged
    pub fn route_start(&self) -> Option<u64> {
        self.shared.lock().cursor.route_start()
    }

    /// Segments contributing events to the current merged view
    pub fn merged_segments(&self) -> Vec<usize> {
        self.shared.lock().view.segment_indices()
    }

    /// Next event that would be published
    pub fn peek_next(&self) -> Option<Event> {
        let s = self.shared.lock();
        if !s.view.covers(s.cursor.segment()) {
            return None;
        }
        let start = s.view.find_after(s.cursor.position());
        let next = (start..s.view.len())
            .map(|i| s.view.event(i))
            .find(|e| self.filter.allows(e.which))
            .cloned();
        next
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Replay {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the segment window and the merger; runs on the tokio runtime
struct Controller {
    window: SegmentWindow,
    merger: EventMerger,
    loader: Arc<dyn SegmentLoader>,
    shared: Arc<Shared>,
    route: Arc<Route>,
}

impl Controller {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ControlMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                ControlMsg::Refresh => self.queue_segments(),
                ControlMsg::LoadFinished {
                    index,
                    generation,
                    outcome,
                } => {
                    if let LoadOutcome::Invalid(reason) = &outcome {
                        info!("segment {} invalid: {}", index, reason);
                    }
                    if self.window.complete(index, generation, outcome) {
                        self.queue_segments();
                    } else {
                        debug!("dropping stale load of segment {}", index);
                    }
                }
                ControlMsg::Stop => break,
            }
        }
        debug!("control task exiting");
    }

    fn queue_segments(&mut self) {
        let update = self.window.update(self.shared.current_segment());
        if !update.evicted.is_empty() {
            let (begin, end) = self.window.range();
            debug!("window [{}, {}], evicting segments {:?}", begin, end, update.evicted);
        }
        for (index, generation) in update.to_load {
            self.spawn_load(index, generation);
        }
        self.merge_segments();
    }

    fn spawn_load(&self, index: usize, generation: u64) {
        let Some(files) = self.route.at(index).cloned() else {
            return;
        };
        debug!("loading segment {}", index);

        let loader = Arc::clone(&self.loader);
        let control = self.shared.control();
        tokio::spawn(async move {
            let outcome = match tokio::spawn(async move { loader.load(files).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("segment {} loader failed: {}", index, e);
                    LoadOutcome::Invalid(e.to_string())
                }
            };
            let _ = control.send(ControlMsg::LoadFinished {
                index,
                generation,
                outcome,
            });
        });
    }

    fn merge_segments(&mut self) {
        let Some(view) = self.merger.rebuild(&self.window.eligible()) else {
            return;
        };
        let view = Arc::new(view);
        debug!("merged {} events from segments {:?}", view.len(), self.merger.merged());

        let previous = self.shared.update(|s| {
            if s.cursor.route_start().is_none() {
                if let Some(start) = view.route_start() {
                    info!("route start {}", start);
                    s.cursor.set_route_start(start);
                }
            }
            std::mem::replace(&mut s.view, Arc::clone(&view))
        });
        // released outside the lock
        drop(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::is_sorted;
    use crate::core::{CameraType, SegmentFiles, Which};
    use crate::error::PublishError;
    use crate::input::mock::mock_payload_time;
    use crate::input::MockSegmentLoader;
    use crate::output::{ChannelSink, Published};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::runtime::Runtime;

    const ROUTE: &str = "3533c53bb29502d1|2019-12-10--01-13-27";
    const START: u64 = 1_000_000_000_000;
    const SEC: u64 = 1_000_000_000;

    fn route(segments: usize) -> Route {
        Route::from_segments(ROUTE, (0..segments).map(SegmentFiles::new).collect()).unwrap()
    }

    fn config(allow: &[&str]) -> ReplayConfig {
        ReplayConfig {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn replay(
        rt: &Runtime,
        segments: usize,
        config: ReplayConfig,
        loader: MockSegmentLoader,
    ) -> (Replay, mpsc::UnboundedReceiver<Published>) {
        let (sink, rx) = ChannelSink::new();
        let replay = Replay::new(
            route(segments),
            config,
            Arc::new(loader),
            Arc::new(sink),
            rt.handle().clone(),
        );
        (replay, rx)
    }

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn next_message(rt: &Runtime, rx: &mut mpsc::UnboundedReceiver<Published>) -> Option<Event> {
        rt.block_on(async {
            loop {
                match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
                    Ok(Some(Published::Message(event))) => return Some(event),
                    Ok(Some(Published::Frame { .. })) => continue,
                    _ => return None,
                }
            }
        })
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Published>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[test]
    fn test_seek_into_invalid_segment_plays_next_valid() {
        let rt = Runtime::new().unwrap();
        let mut loader = MockSegmentLoader::new(START, 10);
        loader.set_invalid(1);
        let (replay, mut rx) = replay(&rt, 3, config(&["carState"]), loader);

        replay.pause(true);
        replay.start().unwrap();
        replay.seek_to(90.0, false);
        assert_eq!(replay.current_segment(), 1);

        assert!(wait_until(|| replay.merged_segments() == vec![0, 2]));
        assert_eq!(replay.route_start(), Some(START));

        replay.pause(false);
        let first = next_message(&rt, &mut rx).unwrap();
        assert_eq!(first.which, Which::CarState);
        assert!(first.mono_time >= START + 90 * SEC);
        assert_eq!(first.mono_time, START + 120 * SEC);
        assert_eq!(mock_payload_time(&first), Some(first.mono_time));

        replay.stop();
    }

    #[test]
    fn test_seek_during_playback_skips_earlier_events() {
        let rt = Runtime::new().unwrap();
        let (replay, mut rx) = replay(&rt, 3, config(&["carState"]), MockSegmentLoader::new(START, 10));

        replay.set_speed(10.0);
        replay.start().unwrap();
        for _ in 0..5 {
            next_message(&rt, &mut rx).unwrap();
        }

        replay.seek_to(150.0, false);
        drain(&mut rx);

        let target = START + 150 * SEC;
        for _ in 0..5 {
            let event = next_message(&rt, &mut rx).unwrap();
            assert!(event.mono_time >= target, "{} before {}", event.mono_time, target);
        }
        assert!(replay.current_seconds() >= 150.0);
        assert_eq!(replay.current_segment(), 2);

        replay.stop();
    }

    #[test]
    fn test_relative_seek_moves_backwards() {
        let rt = Runtime::new().unwrap();
        let (replay, mut rx) = replay(&rt, 3, config(&["carState"]), MockSegmentLoader::new(START, 10));

        replay.pause(true);
        replay.start().unwrap();
        replay.seek_to(130.0, false);
        assert!(wait_until(|| replay.route_start().is_some()));

        replay.seek_to(-100.0, true);
        assert_eq!(replay.current_seconds(), 30.0);
        assert_eq!(replay.current_segment(), 0);

        replay.pause(false);
        let event = next_message(&rt, &mut rx).unwrap();
        assert_eq!(event.mono_time, START + 30 * SEC);

        replay.stop();
    }

    #[test]
    fn test_pause_halts_publishing() {
        let rt = Runtime::new().unwrap();
        let (replay, mut rx) = replay(&rt, 2, config(&[]), MockSegmentLoader::new(START, 10));

        replay.set_speed(10.0);
        replay.start().unwrap();
        next_message(&rt, &mut rx).unwrap();
        assert_eq!(replay.state(), ReplayState::Playing);

        replay.pause(true);
        drain(&mut rx);
        thread::sleep(Duration::from_millis(300));
        assert_eq!(drain(&mut rx), 0);
        assert_eq!(replay.state(), ReplayState::Paused);
        assert!(replay.is_paused());

        let at = replay.current_seconds();
        replay.pause(false);
        let event = next_message(&rt, &mut rx).unwrap();
        assert!(event.mono_time as f64 >= START as f64 + at * SEC as f64);

        replay.stop();
    }

    #[test]
    fn test_seek_is_idempotent() {
        let rt = Runtime::new().unwrap();
        let (replay, _rx) = replay(&rt, 4, config(&[]), MockSegmentLoader::new(START, 10));

        replay.pause(true);
        replay.start().unwrap();

        replay.seek_to(75.0, false);
        let first = (replay.current_seconds(), replay.current_segment());
        replay.seek_to(75.0, false);
        assert_eq!(first, (75.0, 1));
        assert_eq!((replay.current_seconds(), replay.current_segment()), first);

        assert!(wait_until(|| replay.merged_segments().contains(&1)));
        let next = replay.peek_next().unwrap();
        assert_eq!(next.mono_time, START + 75 * SEC);
        replay.seek_to(75.0, false);
        assert_eq!(replay.peek_next(), Some(next));

        replay.stop();
    }

    #[test]
    fn test_seek_clamps_to_route() {
        let rt = Runtime::new().unwrap();
        let (replay, _rx) = replay(&rt, 2, config(&[]), MockSegmentLoader::new(START, 10));

        replay.pause(true);
        replay.start().unwrap();
        assert_eq!(replay.total_seconds(), 120);

        replay.seek_to(-10.0, false);
        assert_eq!(replay.current_seconds(), 0.0);
        assert_eq!(replay.current_segment(), 0);

        replay.seek_to(500.0, false);
        assert!(replay.current_seconds() < 120.0);
        assert_eq!(replay.current_segment(), 1);

        replay.stop();
    }

    #[test]
    fn test_start_fails_for_missing_route() {
        let rt = Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (sink, _rx) = ChannelSink::new();
        let replay = Replay::new(
            Route::new(ROUTE, dir.path()).unwrap(),
            ReplayConfig::default(),
            Arc::new(MockSegmentLoader::new(START, 10)),
            Arc::new(sink),
            rt.handle().clone(),
        );

        assert!(matches!(replay.start(), Err(ReplayError::RouteLoad { .. })));
        assert_eq!(replay.state(), ReplayState::Idle);
        assert!(replay.stream_thread.lock().unwrap().is_none());
    }

    #[test]
    fn test_start_twice_is_an_error() {
        let rt = Runtime::new().unwrap();
        let (replay, _rx) = replay(&rt, 1, config(&[]), MockSegmentLoader::new(START, 10));

        replay.pause(true);
        replay.start().unwrap();
        assert!(matches!(replay.start(), Err(ReplayError::AlreadyStarted)));

        replay.stop();
        assert!(matches!(replay.start(), Err(ReplayError::Stopped)));
    }

    #[test]
    fn test_stop_ends_publishing() {
        let rt = Runtime::new().unwrap();
        let (replay, mut rx) = replay(&rt, 2, config(&[]), MockSegmentLoader::new(START, 10));

        replay.start().unwrap();
        next_message(&rt, &mut rx).unwrap();

        replay.stop();
        assert_eq!(replay.state(), ReplayState::Stopped);
        drain(&mut rx);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(drain(&mut rx), 0);

        // second stop is a no-op
        replay.stop();
    }

    #[test]
    fn test_pending_segment_blocks_later_ones() {
        let rt = Runtime::new().unwrap();
        let mut loader = MockSegmentLoader::new(START, 10);
        loader.set_delay(1, Duration::from_millis(1500));
        let (replay, _rx) = replay(&rt, 3, config(&[]), loader);

        replay.pause(true);
        replay.start().unwrap();
        assert_eq!(replay.state(), ReplayState::Loading);

        assert!(wait_until(|| !replay.merged_segments().is_empty()));
        assert_eq!(replay.merged_segments(), vec![0]);
        assert_eq!(replay.state(), ReplayState::Paused);

        assert!(wait_until(|| replay.merged_segments() == vec![0, 1, 2]));

        let view = Arc::clone(&replay.shared.lock().view);
        assert_eq!(view.len(), 3 * (1 + 600 * 4));
        assert!(is_sorted(&view.iter().cloned().collect::<Vec<_>>()));

        replay.stop();
    }

    #[test]
    fn test_camera_frames_are_published() {
        let rt = Runtime::new().unwrap();
        let (sink, mut rx) = ChannelSink::new();
        let replay = Replay::new(
            route(1),
            config(&["roadCameraState"]),
            Arc::new(MockSegmentLoader::new(START, 10)),
            Arc::new(sink.clone()),
            rt.handle().clone(),
        )
        .with_frame_sink(Arc::new(sink));

        replay.set_speed(10.0);
        replay.start().unwrap();

        let items: Vec<Published> = rt.block_on(async {
            let mut items = Vec::new();
            while items.len() < 4 {
                match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
                    Ok(Some(item)) => items.push(item),
                    _ => break,
                }
            }
            items
        });
        replay.stop();

        assert_eq!(items.len(), 4);
        match (&items[0], &items[1]) {
            (Published::Frame { camera, frame_id, data }, Published::Message(event)) => {
                assert_eq!(*camera, CameraType::Road);
                assert_eq!(*frame_id, 0);
                assert_eq!(data, &0u32.to_le_bytes().to_vec());
                assert_eq!(event.which, Which::RoadCameraState);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&items[2], Published::Frame { frame_id: 1, .. }));
    }

    /// Loader whose decoder crashes on one segment
    struct CrashingLoader {
        inner: MockSegmentLoader,
        crash_on: usize,
    }

    #[async_trait]
    impl SegmentLoader for CrashingLoader {
        async fn load(&self, files: SegmentFiles) -> LoadOutcome {
            if files.index == self.crash_on {
                panic!("decoder crashed on segment {}", files.index);
            }
            self.inner.load(files).await
        }
    }

    /// Sink that rejects everything and counts the attempts
    #[derive(Default)]
    struct RejectingSink {
        messages: AtomicUsize,
        frames: AtomicUsize,
    }

    impl MessageSink for RejectingSink {
        fn publish(&self, _event: &Event) -> Result<(), PublishError> {
            self.messages.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Closed)
        }
    }

    impl FrameSink for RejectingSink {
        fn publish_frame(&self, _camera: CameraType, _frame_id: u32, _frame: &[u8]) -> Result<(), PublishError> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Closed)
        }
    }

    #[test]
    fn test_crashed_load_becomes_invalid() {
        let rt = Runtime::new().unwrap();
        let (sink, mut rx) = ChannelSink::new();
        let loader = CrashingLoader {
            inner: MockSegmentLoader::new(START, 10),
            crash_on: 1,
        };
        let replay = Replay::new(
            route(3),
            config(&["carState"]),
            Arc::new(loader),
            Arc::new(sink),
            rt.handle().clone(),
        );

        replay.pause(true);
        replay.start().unwrap();
        assert!(wait_until(|| replay.merged_segments() == vec![0, 2]));

        replay.seek_to(130.0, false);
        assert!(wait_until(|| replay.peek_next().is_some()));
        assert_eq!(replay.peek_next().unwrap().mono_time, START + 130 * SEC);

        replay.pause(false);
        let event = next_message(&rt, &mut rx).unwrap();
        assert_eq!(event.mono_time, START + 130 * SEC);

        replay.stop();
    }

    #[test]
    fn test_peek_waits_for_target_segment() {
        let rt = Runtime::new().unwrap();
        let mut loader = MockSegmentLoader::new(START, 10);
        loader.set_delay(3, Duration::from_secs(30));
        let (replay, _rx) = replay(&rt, 4, config(&["carState"]), loader);

        replay.pause(true);
        replay.start().unwrap();
        assert!(wait_until(|| replay.merged_segments() == vec![0, 1, 2]));
        assert!(replay.peek_next().is_some());

        // segment 3 is still loading: nothing is playable yet
        replay.seek_to(200.0, false);
        assert_eq!(replay.current_segment(), 3);
        assert_eq!(replay.peek_next(), None);

        replay.stop();
    }

    #[test]
    fn test_failing_sinks_do_not_stall_playback() {
        let rt = Runtime::new().unwrap();
        let sink = Arc::new(RejectingSink::default());
        let replay = Replay::new(
            route(2),
            config(&["carState", "roadCameraState"]),
            Arc::new(MockSegmentLoader::new(START, 10)),
            Arc::clone(&sink) as Arc<dyn MessageSink>,
            rt.handle().clone(),
        )
        .with_frame_sink(Arc::clone(&sink) as Arc<dyn FrameSink>);

        replay.set_speed(10.0);
        replay.start().unwrap();

        assert!(wait_until(|| sink.messages.load(Ordering::SeqCst) >= 50));
        assert!(sink.frames.load(Ordering::SeqCst) > 0);

        let at = replay.current_seconds();
        assert!(wait_until(|| replay.current_seconds() > at + 1.0));
        assert_eq!(replay.state(), ReplayState::Playing);

        replay.stop();
    }

    #[test]
    fn test_speed_is_clamped() {
        let rt = Runtime::new().unwrap();
        let (replay, _rx) = replay(&rt, 1, config(&[]), MockSegmentLoader::new(START, 10));

        replay.set_speed(100.0);
        assert_eq!(replay.speed(), 10.0);
        replay.set_speed(0.0);
        assert_eq!(replay.speed(), 0.1);
    }
}
