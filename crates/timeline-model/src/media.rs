//! Media references and clip-level types.

use serde::{Deserialize, Serialize};

use cinecut_common::time::{RationalTime, TimeRange};

/// What a clip points at. Only `External` yields real media; the other
/// variants still occupy their full duration on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaReference {
    /// A real media source identified by a stable id and a resource locator.
    External {
        /// Stable media id; one physical source per id.
        id: String,

        /// Resource locator (file path or URL) handed to the render engine.
        target_url: String,

        /// The source's usable range, when known at import time.
        #[serde(default)]
        available_range: Option<TimeRange>,
    },

    /// The source went missing after the clip was cut.
    Missing,

    /// A synthesized source (color, test pattern). The render program
    /// substitutes its fallback producer.
    Generator { kind: String },
}

impl MediaReference {
    pub fn is_external(&self) -> bool {
        matches!(self, MediaReference::External { .. })
    }
}

/// A clip: a source range cut from a media reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Display name, empty when the editor never named the clip.
    #[serde(default)]
    pub name: String,

    /// The portion of the source this clip plays.
    pub source_range: TimeRange,

    /// What the clip points at.
    pub reference: MediaReference,
}

/// A gap: silence/black for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub duration: RationalTime,
}
