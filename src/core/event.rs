use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Camera streams recorded alongside the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CameraType {
    Road,
    Driver,
    WideRoad,
}

impl CameraType {
    pub const ALL: [CameraType; 3] = [CameraType::Road, CameraType::Driver, CameraType::WideRoad];

    pub fn name(self) -> &'static str {
        match self {
            CameraType::Road => "road",
            CameraType::Driver => "driver",
            CameraType::WideRoad => "wideRoad",
        }
    }
}

macro_rules! services {
    ($($variant:ident = $ord:literal => $name:literal,)+) => {
        /// Event type tag
        ///
        /// The discriminant is the type ordinal: events sharing a timestamp are
        /// ordered by it, lowest first.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum Which {
            $($variant = $ord,)+
        }

        impl Which {
            pub const ALL: &'static [Which] = &[$(Which::$variant,)+];

            /// Service name the event is published under
            pub fn name(self) -> &'static str {
                match self {
                    $(Which::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Which> {
                match name {
                    $($name => Some(Which::$variant),)+
                    _ => None,
                }
            }

            pub fn from_ordinal(ordinal: u16) -> Option<Which> {
                match ordinal {
                    $($ord => Some(Which::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

services! {
    InitData = 0 => "initData",
    CarParams = 1 => "carParams",
    Can = 2 => "can",
    Sendcan = 3 => "sendcan",
    CarState = 4 => "carState",
    ControlsState = 5 => "controlsState",
    RadarState = 6 => "radarState",
    ModelV2 = 7 => "modelV2",
    LiveCalibration = 8 => "liveCalibration",
    LiveLocationKalman = 9 => "liveLocationKalman",
    DriverMonitoringState = 10 => "driverMonitoringState",
    DriverStateV2 = 11 => "driverStateV2",
    RoadCameraState = 12 => "roadCameraState",
    DriverCameraState = 13 => "driverCameraState",
    WideRoadCameraState = 14 => "wideRoadCameraState",
    RoadEncodeIdx = 15 => "roadEncodeIdx",
    DriverEncodeIdx = 16 => "driverEncodeIdx",
    WideRoadEncodeIdx = 17 => "wideRoadEncodeIdx",
    NavInstruction = 18 => "navInstruction",
    NavRoute = 19 => "navRoute",
    UiPlan = 20 => "uiPlan",
    GpsLocationExternal = 21 => "gpsLocationExternal",
    SensorEvents = 22 => "sensorEvents",
}

impl Which {
    pub fn ordinal(self) -> u16 {
        self as u16
    }

    /// Camera whose frame this event announces, if any
    pub fn camera_state(self) -> Option<CameraType> {
        match self {
            Which::RoadCameraState => Some(CameraType::Road),
            Which::DriverCameraState => Some(CameraType::Driver),
            Which::WideRoadCameraState => Some(CameraType::WideRoad),
            Which::InitData
            | Which::CarParams
            | Which::Can
            | Which::Sendcan
            | Which::CarState
            | Which::ControlsState
            | Which::RadarState
            | Which::ModelV2
            | Which::LiveCalibration
            | Which::LiveLocationKalman
            | Which::DriverMonitoringState
            | Which::DriverStateV2
            | Which::RoadEncodeIdx
            | Which::DriverEncodeIdx
            | Which::WideRoadEncodeIdx
            | Which::NavInstruction
            | Which::NavRoute
            | Which::UiPlan
            | Which::GpsLocationExternal
            | Which::SensorEvents => None,
        }
    }

    /// Camera whose encode index this event carries, if any
    pub fn encode_idx(self) -> Option<CameraType> {
        match self {
            Which::RoadEncodeIdx => Some(CameraType::Road),
            Which::DriverEncodeIdx => Some(CameraType::Driver),
            Which::WideRoadEncodeIdx => Some(CameraType::WideRoad),
            _ => None,
        }
    }
}

/// Location of an encoded camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeIdx {
    /// Segment the frame is stored in
    pub segment_num: u32,
    /// Frame offset inside that segment's camera file
    pub segment_offset: u32,
}

/// A single timestamped message from a segment log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Monotonic log time in nanoseconds
    pub mono_time: u64,
    pub which: Which,
    /// Raw message payload
    pub data: Vec<u8>,
}

impl Event {
    pub fn new(mono_time: u64, which: Which, data: Vec<u8>) -> Self {
        Self { mono_time, which, data }
    }

    /// Sort key: timestamp, then type ordinal
    pub fn key(&self) -> (u64, u16) {
        (self.mono_time, self.which.ordinal())
    }

    /// Frame id announced by a camera-state event
    pub fn camera_frame(&self) -> Option<(CameraType, u32)> {
        let camera = self.which.camera_state()?;
        Some((camera, read_u32(&self.data, 0)?))
    }

    /// Decode the payload of an encode-index event
    ///
    /// Layout: `frame_id u32 | segment_num u32 | segment_offset u32`, little endian.
    pub fn encode_idx(&self) -> Option<(CameraType, u32, EncodeIdx)> {
        let camera = self.which.encode_idx()?;
        let frame_id = read_u32(&self.data, 0)?;
        let idx = EncodeIdx {
            segment_num: read_u32(&self.data, 4)?,
            segment_offset: read_u32(&self.data, 8)?,
        };
        Some((camera, frame_id, idx))
    }

    /// Payload as hex string
    pub fn hex_data(&self) -> String {
        self.data
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("")
    }

    /// Parse hex string to payload bytes
    pub fn parse_hex(hex: &str) -> Option<Vec<u8>> {
        let hex = hex.trim().replace(' ', "");
        let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(&hex);

        if hex.len() % 2 != 0 {
            return None;
        }

        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Build the payload of an encode-index event
pub fn encode_idx_payload(frame_id: u32, idx: EncodeIdx) -> Vec<u8> {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&frame_id.to_le_bytes());
    data.extend_from_slice(&idx.segment_num.to_le_bytes());
    data.extend_from_slice(&idx.segment_offset.to_le_bytes());
    data
}

/// Check that events are sorted by (timestamp, type ordinal)
pub fn is_sorted(events: &[Event]) -> bool {
    events.windows(2).all(|w| w[0].key() <= w[1].key())
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
