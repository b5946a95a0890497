use crate::core::{CameraType, Event};
use crate::error::PublishError;
use crate::output::{FrameSink, MessageSink};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[derive(Serialize)]
struct MessageLine<'a> {
    mono_time: u64,
    which: &'static str,
    data: &'a str,
}

/// Sink writing one JSON object per message to a writer
pub struct LogSink<W: Write + Send> {
    writer: Mutex<W>,
    messages: AtomicU64,
    frames: AtomicU64,
}

impl<W: Write + Send> LogSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            messages: AtomicU64::new(0),
            frames: AtomicU64::new(0),
        }
    }

    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> MessageSink for LogSink<W> {
    fn publish(&self, event: &Event) -> Result<(), PublishError> {
        let hex = event.hex_data();
        let line = MessageLine {
            mono_time: event.mono_time,
            which: event.which.name(),
            data: &hex,
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, &line)?;
        writer.write_all(b"\n")?;
        self.messages.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl<W: Write + Send> FrameSink for LogSink<W> {
    fn publish_frame(&self, camera: CameraType, frame_id: u32, frame: &[u8]) -> Result<(), PublishError> {
        debug!("{} camera frame {} ({} bytes)", camera.name(), frame_id, frame.len());
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Which;

    #[test]
    fn test_log_sink_writes_json_lines() {
        let sink = LogSink::new(Vec::new());
        sink.publish(&Event::new(5, Which::CarState, vec![0xAB])).unwrap();
        sink.publish(&Event::new(6, Which::Can, vec![])).unwrap();
        sink.publish_frame(CameraType::Road, 1, &[0; 4]).unwrap();

        assert_eq!(sink.message_count(), 2);
        assert_eq!(sink.frame_count(), 1);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["which"], "carState");
        assert_eq!(lines[0]["data"], "AB");
        assert_eq!(lines[1]["mono_time"], 6);
    }
}
