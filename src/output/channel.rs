use crate::core::{CameraType, Event};
use crate::error::PublishError;
use crate::output::{FrameSink, MessageSink};
use tokio::sync::mpsc;

/// Item delivered by a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Message(Event),
    Frame {
        camera: CameraType,
        frame_id: u32,
        data: Vec<u8>,
    },
}

/// Sink forwarding everything over an unbounded tokio channel
///
/// Never blocks the stream thread. Publishing fails with
/// [`PublishError::Closed`] once the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Published>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Published>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn publish(&self, event: &Event) -> Result<(), PublishError> {
        self.tx
            .send(Published::Message(event.clone()))
            .map_err(|_| PublishError::Closed)
    }
}

impl FrameSink for ChannelSink {
    fn publish_frame(&self, camera: CameraType, frame_id: u32, frame: &[u8]) -> Result<(), PublishError> {
        self.tx
            .send(Published::Frame {
                camera,
                frame_id,
                data: frame.to_vec(),
            })
            .map_err(|_| PublishError::Closed)
    }
}
