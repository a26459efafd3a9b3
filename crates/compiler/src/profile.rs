//! Encode target profiles.

use serde::{Deserialize, Serialize};

use cinecut_common::time::FrameRate;

/// The encode target a program is compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub description: String,

    pub width: u32,
    pub height: u32,

    pub frame_rate_num: u32,
    pub frame_rate_den: u32,

    /// Audio sample rate in Hz.
    pub sample_rate: u32,

    /// Audio channel count.
    pub channels: u32,

    pub progressive: bool,
}

impl Default for Profile {
    /// The single documented fallback profile: 1080p, 30 fps, 48 kHz stereo,
    /// progressive.
    fn default() -> Self {
        Self {
            description: "HD 1080p 30 fps".to_string(),
            width: 1920,
            height: 1080,
            frame_rate_num: 30,
            frame_rate_den: 1,
            sample_rate: 48000,
            channels: 2,
            progressive: true,
        }
    }
}

impl Profile {
    /// The lower-resolution profile substituted by the `preview` preset when
    /// the caller does not supply one.
    pub fn preview() -> Self {
        Self {
            description: "Preview 540p 30 fps".to_string(),
            width: 960,
            height: 540,
            ..Self::default()
        }
    }

    /// The profile frame rate. Panics on a zero numerator or denominator,
    /// which is a malformed profile.
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.frame_rate_num, self.frame_rate_den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_documented_fallback() {
        let profile = Profile::default();
        assert_eq!(profile.width, 1920);
        assert_eq!(profile.height, 1080);
        assert_eq!(profile.frame_rate_num, 30);
        assert_eq!(profile.frame_rate_den, 1);
        assert_eq!(profile.sample_rate, 48000);
        assert_eq!(profile.channels, 2);
        assert!(profile.progressive);
    }

    #[test]
    fn test_preview_profile_is_quarter_resolution() {
        let profile = Profile::preview();
        assert_eq!(profile.width, 960);
        assert_eq!(profile.height, 540);
        assert_eq!(profile.frame_rate(), FrameRate::whole(30));
    }
}
