//! Route and segment locators
//!
//! A route is one recording, split into fixed 60 second segments stored in
//! folders named `<timestamp>--<n>` under a data directory.

use crate::core::CameraType;
use crate::error::ReplayError;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Length of one segment in seconds
pub const SEGMENT_SECONDS: u64 = 60;

/// Parsed route identifier, `<dongle>|<YYYY-MM-DD--HH-MM-SS>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteName {
    pub dongle_id: Option<String>,
    pub timestamp: String,
}

impl RouteName {
    pub fn parse(name: &str) -> Result<Self, ReplayError> {
        let (dongle_id, timestamp) = match name.split_once('|') {
            Some((dongle, ts)) => (Some(dongle.to_string()).filter(|d| !d.is_empty()), ts),
            None => (None, name),
        };

        if timestamp.is_empty() || timestamp.contains(['/', '\\']) {
            return Err(ReplayError::InvalidRouteName(name.to_string()));
        }

        Ok(Self {
            dongle_id,
            timestamp: timestamp.to_string(),
        })
    }

    /// Wall-clock start of the recording, when the name carries one
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d--%H-%M-%S").ok()
    }
}

impl std::fmt::Display for RouteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.dongle_id {
            Some(dongle) => write!(f, "{}|{}", dongle, self.timestamp),
            None => write!(f, "{}", self.timestamp),
        }
    }
}

/// Files making up one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFiles {
    pub index: usize,
    /// Event log, binary `rlog` or `rlog.csv`
    pub log: Option<PathBuf>,
    pub road_cam: Option<PathBuf>,
    pub driver_cam: Option<PathBuf>,
    pub wide_road_cam: Option<PathBuf>,
}

impl SegmentFiles {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Collect the files present in a segment folder
    pub fn from_dir(index: usize, dir: &Path) -> Self {
        let existing = |name: &str| {
            let path = dir.join(name);
            path.is_file().then_some(path)
        };

        Self {
            index,
            log: existing("rlog").or_else(|| existing("rlog.csv")),
            road_cam: existing("fcamera.frames"),
            driver_cam: existing("dcamera.frames"),
            wide_road_cam: existing("ecamera.frames"),
        }
    }

    pub fn camera(&self, camera: CameraType) -> Option<&Path> {
        match camera {
            CameraType::Road => self.road_cam.as_deref(),
            CameraType::Driver => self.driver_cam.as_deref(),
            CameraType::WideRoad => self.wide_road_cam.as_deref(),
        }
    }
}

/// One recording: an ordered list of segment locators
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Route {
    name: RouteName,
    data_dir: Option<PathBuf>,
    segments: Vec<SegmentFiles>,
}

impl Route {
    /// Route stored under a local data directory, not yet enumerated
    pub fn new(name: &str, data_dir: impl Into<PathBuf>) -> Result<Self, ReplayError> {
        Ok(Self {
            name: RouteName::parse(name)?,
            data_dir: Some(data_dir.into()),
            segments: Vec::new(),
        })
    }

    /// Route with explicit segment locators
    pub fn from_segments(name: &str, segments: Vec<SegmentFiles>) -> Result<Self, ReplayError> {
        Ok(Self {
            name: RouteName::parse(name)?,
            data_dir: None,
            segments,
        })
    }

    /// Enumerate the route's segments
    ///
    /// Fails when the data directory can't be read or holds no segment of this route.
    pub fn load(&mut self) -> Result<(), ReplayError> {
        if let Some(dir) = self.data_dir.clone() {
            self.segments = self.scan(&dir)?;
        }

        if self.segments.is_empty() {
            return Err(self.load_error("no segments found".to_string()));
        }

        info!("loaded route {} with {} segments", self.name, self.segments.len());
        Ok(())
    }

    fn scan(&self, dir: &Path) -> Result<Vec<SegmentFiles>, ReplayError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| self.load_error(format!("{}: {}", dir.display(), e)))?;

        let prefix = format!("{}--", self.name.timestamp);
        let mut found = BTreeMap::new();

        for entry in entries {
            let entry = entry.map_err(|e| self.load_error(e.to_string()))?;
            let file_name = entry.file_name();
            let Some(folder) = file_name.to_str() else { continue };
            let Some(index) = folder
                .strip_prefix(&prefix)
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };

            if entry.path().is_dir() {
                debug!("found segment {} at {}", index, entry.path().display());
                found.insert(index, SegmentFiles::from_dir(index, &entry.path()));
            }
        }

        // Missing folders become empty locators so segment numbers stay aligned
        // with their position in the route.
        let count = found.keys().next_back().map_or(0, |last| last + 1);
        Ok((0..count)
            .map(|i| found.remove(&i).unwrap_or_else(|| SegmentFiles::new(i)))
            .collect())
    }

    fn load_error(&self, reason: String) -> ReplayError {
        ReplayError::RouteLoad {
            route: self.name.to_string(),
            reason,
        }
    }

    pub fn name(&self) -> &RouteName {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&SegmentFiles> {
        self.segments.get(index)
    }

    pub fn total_seconds(&self) -> u64 {
        self.segments.len() as u64 * SEGMENT_SECONDS
    }
}
