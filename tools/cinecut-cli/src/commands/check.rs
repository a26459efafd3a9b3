//! Check render engine availability.

use cinecut_common::config::AppConfig;
use cinecut_render::{MeltEngine, RenderEngine};

pub async fn run() -> anyhow::Result<()> {
    println!("Cinecut System Check");
    println!("{}", "=".repeat(50));

    let config = AppConfig::load();
    let engine = MeltEngine::from_config(&config);
    let status = engine.check_availability().await;

    if status.available {
        println!("[OK] Render engine: melt");
        if let Some(path) = &status.path {
            println!("     Path: {path}");
        }
        if let Some(version) = &status.version {
            println!("     Version: {version}");
        }
    } else {
        println!("[FAIL] Render engine: melt");
        if let Some(error) = &status.error {
            println!("       {error}");
        }
    }

    println!("Renders directory: {}", config.renders_dir.display());
    println!("Temp directory: {}", config.temp_dir.display());

    println!();
    if status.available {
        println!("Render engine is available. Cinecut is ready.");
    } else {
        println!("Render engine is missing. Install MLT to enable rendering.");
    }

    Ok(())
}
