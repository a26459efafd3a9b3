//! Render a timeline to a video file.

use std::io::Write;
use std::path::PathBuf;

use cinecut_common::config::AppConfig;
use cinecut_render::{
    JobStatus, MeltEngine, ProgressCallback, RenderOptions, RenderPreset, RenderService,
};
use cinecut_timeline::Timeline;

pub async fn run(
    timeline_path: PathBuf,
    preset: String,
    output: Option<PathBuf>,
    crf: Option<u32>,
) -> anyhow::Result<()> {
    let timeline = Timeline::from_json_file(&timeline_path)
        .map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))?;
    let preset: RenderPreset = preset.parse().map_err(|e| anyhow::anyhow!("{e}"))?;

    let config = AppConfig::load();
    config.ensure_dirs()?;
    let engine = MeltEngine::from_config(&config);
    let service = RenderService::new(engine, &config);

    let base_name = timeline_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "render".to_string());
    let output_path = output.unwrap_or_else(|| service.generate_output_path(&base_name, preset));

    let mut options = RenderOptions::new(output_path.clone(), preset);
    options.crf = crf;

    println!("Rendering timeline: {}", timeline_path.display());
    println!("  Output: {}", output_path.display());
    println!("  Preset: {}", preset.as_str());

    let progress_cb: ProgressCallback = Box::new(|progress| {
        let eta = progress
            .estimated_remaining_secs
            .map(|secs| format!(", ETA: {secs:.0}s"))
            .unwrap_or_default();
        print!(
            "\r  Progress: {}% ({}/{} frames{eta})  ",
            progress.percentage, progress.current_frame, progress.total_frames,
        );
        std::io::stdout().flush().ok();
    });

    let job = service
        .submit_render(&timeline, options, Some(progress_cb))
        .await;

    match job.status {
        JobStatus::Completed => println!("\nRender complete: {}", output_path.display()),
        JobStatus::Cancelled => println!("\nRender cancelled."),
        _ => println!(
            "\nRender failed: {}",
            job.progress
                .error
                .unwrap_or_else(|| "unknown error".to_string())
        ),
    }

    Ok(())
}
