use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::params::VisualParams;

/// Saved camera pose, row-vector triples to keep the JSON compact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: [0.0, 2.2, 6.0],
            target: [0.0, 1.0, 0.0],
        }
    }
}

/// Playlist position at save time. `url` lets a restore verify the playlist
/// still matches before resuming at `index`.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaSlot {
    pub index: usize,
    pub url: Option<String>,
}

/// The one JSON document round-tripped through storage and served as the
/// remote default preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Unix millis at save time
    pub ts: f64,
    pub params: VisualParams,
    pub camera: CameraPose,
    pub media: MediaSlot,
    #[serde(rename = "loop")]
    pub loop_current: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            ts: 0.0,
            params: VisualParams::default(),
            camera: CameraPose::default(),
            media: MediaSlot::default(),
            loop_current: false,
        }
    }
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("serializing snapshot")
    }

    /// Parse a stored or fetched snapshot. Unknown fields are ignored and
    /// missing ones fall back to defaults, so older saves keep loading.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing snapshot")
    }
}
