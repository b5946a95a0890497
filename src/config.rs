//! Persistent replay settings
//!
//! Stored as pretty JSON in the user's config directory. Every field has a
//! default, so older or partial files still load.

use crate::playback::SeekBoundary;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Directory holding route segment folders
    pub data_dir: PathBuf,
    /// Services to publish; empty means all
    pub allow: Vec<String>,
    /// Services never published
    pub block: Vec<String>,
    /// Offset into the route where playback begins
    pub start_seconds: f64,
    /// 1.0 = real-time, 2.0 = 2x speed
    pub speed: f64,
    /// Valid segments kept loaded ahead of the current one
    pub forward_segments: usize,
    /// Segments kept loaded behind the current one
    pub backward_segments: usize,
    pub seek_boundary: SeekBoundary,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .map(|p| p.join("rlog-replay").join("realdata"))
                .unwrap_or_else(|| PathBuf::from("realdata")),
            allow: Vec::new(),
            block: Vec::new(),
            start_seconds: 0.0,
            speed: 1.0,
            forward_segments: 3,
            backward_segments: 1,
            seek_boundary: SeekBoundary::default(),
        }
    }
}

impl ReplayConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rlog-replay").join("settings.json"))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring settings: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!("loaded settings from {}", path.display());
        Ok(config)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("no config directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
