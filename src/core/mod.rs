pub mod event;
pub mod route;

pub use event::{CameraType, EncodeIdx, Event, Which};
pub use route::{Route, RouteName, SegmentFiles, SEGMENT_SECONDS};
