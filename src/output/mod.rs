//! Output sinks for replayed events and camera frames
//!
//! Sinks are called from the stream thread and must return quickly; a sink
//! that blocks holds up playback pacing. Failures are reported back as
//! [`PublishError`] and are only logged by the caller.

pub mod channel;
pub mod log;

pub use channel::{ChannelSink, Published};
pub use log::LogSink;

use crate::core::{CameraType, Event, Which};
use crate::error::PublishError;
use std::collections::HashSet;
use tracing::warn;

/// Receiver of replayed messages
pub trait MessageSink: Send + Sync {
    /// Publish one event under its service name (`event.which.name()`)
    fn publish(&self, event: &Event) -> Result<(), PublishError>;
}

/// Receiver of camera frames resolved through the encode index
pub trait FrameSink: Send + Sync {
    fn publish_frame(&self, camera: CameraType, frame_id: u32, frame: &[u8]) -> Result<(), PublishError>;
}

/// Set of event types the replay publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    allowed: HashSet<Which>,
}

impl EventFilter {
    /// Build from allow/block lists of service names
    ///
    /// An empty allow list means every service except the blocked ones.
    pub fn new<S: AsRef<str>>(allow: &[S], block: &[S]) -> Self {
        let allow = parse_names(allow);
        let block = parse_names(block);

        let allowed = Which::ALL
            .iter()
            .copied()
            .filter(|which| (allow.is_empty() || allow.contains(which)) && !block.contains(which))
            .collect();

        Self { allowed }
    }

    /// Filter passing every event type
    pub fn all() -> Self {
        Self {
            allowed: Which::ALL.iter().copied().collect(),
        }
    }

    pub fn allows(&self, which: Which) -> bool {
        self.allowed.contains(&which)
    }

    /// Allowed service names, in ordinal order
    pub fn names(&self) -> Vec<&'static str> {
        Which::ALL
            .iter()
            .filter(|w| self.allows(**w))
            .map(|w| w.name())
            .collect()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

fn parse_names<S: AsRef<str>>(names: &[S]) -> HashSet<Which> {
    names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref().trim();
            let which = Which::from_name(name);
            if which.is_none() {
                warn!("ignoring unknown service {:?}", name);
            }
            which
        })
        .collect()
}
