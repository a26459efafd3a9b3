//! Show the render preset table.

use cinecut_render::{default_profile_for, RenderPreset};

pub fn run() -> anyhow::Result<()> {
    println!(
        "{:<10} {:<10} {:<8} {:<8} {:<5} Profile",
        "Preset", "Video", "Audio", "Bitrate", "CRF"
    );
    for preset in RenderPreset::all() {
        let defaults = preset.defaults();
        let profile = default_profile_for(preset);
        println!(
            "{:<10} {:<10} {:<8} {:<8} {:<5} {}x{} @ {} fps",
            preset.as_str(),
            defaults.video_codec,
            defaults.audio_codec,
            defaults.audio_bitrate,
            defaults.crf,
            profile.width,
            profile.height,
            profile.frame_rate(),
        );
    }
    Ok(())
}
