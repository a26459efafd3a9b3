//! Compile a timeline to an MLT composition program.

use std::path::PathBuf;

use cinecut_common::config::AppConfig;
use cinecut_compiler::compile;
use cinecut_render::{default_profile_for, MeltEngine, RenderEngine, RenderPreset};
use cinecut_timeline::Timeline;

pub async fn run(
    timeline_path: PathBuf,
    preset: String,
    output: Option<PathBuf>,
    validate: bool,
) -> anyhow::Result<()> {
    let timeline = Timeline::from_json_file(&timeline_path)
        .map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))?;
    let preset: RenderPreset = preset.parse().map_err(|e| anyhow::anyhow!("{e}"))?;

    let profile = default_profile_for(preset);
    let program = compile(&timeline, &profile)?;

    if validate {
        let config = AppConfig::load();
        let engine = MeltEngine::from_config(&config);
        let result = engine.validate(&program).await;
        if result.valid {
            eprintln!("Program is valid.");
        } else {
            return Err(anyhow::anyhow!(
                "Program failed validation: {}",
                result.error.unwrap_or_default()
            ));
        }
    }

    match output {
        Some(out) => {
            std::fs::write(&out, &program)?;
            println!("Wrote {}", out.display());
        }
        None => print!("{program}"),
    }

    Ok(())
}
