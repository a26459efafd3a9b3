//! Timeline: settings plus ordered tracks, and the read-only query surface.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cinecut_common::time::{FrameRate, RationalTime};

use crate::track::{Track, TrackKind};

/// Settings fixed for the lifetime of a compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// The project frame rate used for all conversions.
    pub frame_rate: FrameRate,
}

/// A non-destructive edit timeline: ordered tracks of clips and gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Display name, empty for untitled timelines.
    #[serde(default)]
    pub name: String,

    pub settings: TimelineSettings,

    /// All tracks in compositing order: earlier tracks sit beneath later
    /// ones of the same kind.
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            name: String::new(),
            settings: TimelineSettings { frame_rate },
            tracks: vec![],
        }
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    /// Tracks of one kind, in original order.
    pub fn tracks(&self, kind: TrackKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Total timeline duration: the longest track, as an exact frame count
    /// at the project rate. An empty timeline has zero duration.
    pub fn duration(&self) -> RationalTime {
        let rate = self.settings.frame_rate;
        let frames = self
            .tracks
            .iter()
            .map(|t| t.duration_frames(rate))
            .max()
            .unwrap_or(0);
        RationalTime::new(frames, rate)
    }

    /// Load a timeline from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| TimelineError::IoError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| TimelineError::ParseError { path, source: e })
    }
}

/// Errors that can occur when loading a timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
