//! Render presets and option resolution.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cinecut_common::error::CinecutError;
use cinecut_common::time::FrameRate;
use cinecut_compiler::Profile;

/// A named bundle of default encode parameters. Presets supply defaults
/// only; any explicitly-set caller field wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPreset {
    Preview,
    Draft,
    High,
    Master,
}

impl RenderPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderPreset::Preview => "preview",
            RenderPreset::Draft => "draft",
            RenderPreset::High => "high",
            RenderPreset::Master => "master",
        }
    }

    pub fn all() -> [RenderPreset; 4] {
        [
            RenderPreset::Preview,
            RenderPreset::Draft,
            RenderPreset::High,
            RenderPreset::Master,
        ]
    }

    /// The documented default table for this preset.
    pub fn defaults(&self) -> PresetDefaults {
        match self {
            RenderPreset::Preview => PresetDefaults {
                video_codec: "libx264",
                audio_codec: "aac",
                audio_bitrate: "128k",
                crf: 28,
            },
            RenderPreset::Draft => PresetDefaults {
                video_codec: "libx264",
                audio_codec: "aac",
                audio_bitrate: "128k",
                crf: 23,
            },
            RenderPreset::High => PresetDefaults {
                video_codec: "libx264",
                audio_codec: "aac",
                audio_bitrate: "192k",
                crf: 18,
            },
            RenderPreset::Master => PresetDefaults {
                video_codec: "libx264",
                audio_codec: "aac",
                audio_bitrate: "320k",
                crf: 14,
            },
        }
    }
}

impl FromStr for RenderPreset {
    type Err = CinecutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(RenderPreset::Preview),
            "draft" => Ok(RenderPreset::Draft),
            "high" => Ok(RenderPreset::High),
            "master" => Ok(RenderPreset::Master),
            other => Err(CinecutError::config(format!(
                "unknown preset {other:?}; use preview, draft, high, or master"
            ))),
        }
    }
}

/// Default encode parameters for one preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetDefaults {
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub crf: u32,
}

/// A render request as the caller states it: a preset plus any overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub output_path: PathBuf,
    pub preset: RenderPreset,

    /// Full profile override; wins over any preset substitution.
    #[serde(default)]
    pub profile: Option<Profile>,

    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default)]
    pub audio_bitrate: Option<String>,
    #[serde(default)]
    pub crf: Option<u32>,

    /// Optional frame range; the engine clips playback to it.
    #[serde(default)]
    pub start_frame: Option<i64>,
    #[serde(default)]
    pub end_frame: Option<i64>,
}

impl RenderOptions {
    pub fn new(output_path: impl Into<PathBuf>, preset: RenderPreset) -> Self {
        Self {
            output_path: output_path.into(),
            preset,
            profile: None,
            video_codec: None,
            audio_codec: None,
            audio_bitrate: None,
            crf: None,
            start_frame: None,
            end_frame: None,
        }
    }
}

/// The flat encode bundle handed to the render engine gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub crf: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

/// The outcome of preset resolution: one concrete profile and one concrete
/// encode bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRender {
    pub profile: Profile,
    pub encode: EncodeSettings,
}

/// The profile a preset falls back to when the caller supplies none.
pub fn default_profile_for(preset: RenderPreset) -> Profile {
    if preset == RenderPreset::Preview {
        Profile::preview()
    } else {
        Profile::default()
    }
}

/// Merge a preset with caller overrides. Pure: identical options always
/// resolve identically.
pub fn resolve(options: &RenderOptions) -> ResolvedRender {
    let defaults = options.preset.defaults();

    let profile = options
        .profile
        .clone()
        .unwrap_or_else(|| default_profile_for(options.preset));

    let encode = EncodeSettings {
        video_codec: options
            .video_codec
            .clone()
            .unwrap_or_else(|| defaults.video_codec.to_string()),
        audio_codec: options
            .audio_codec
            .clone()
            .unwrap_or_else(|| defaults.audio_codec.to_string()),
        audio_bitrate: options
            .audio_bitrate
            .clone()
            .unwrap_or_else(|| defaults.audio_bitrate.to_string()),
        crf: options.crf.unwrap_or(defaults.crf),
        width: profile.width,
        height: profile.height,
        frame_rate: profile.frame_rate(),
    };

    ResolvedRender { profile, encode }
}
