//! Check that the pipeline can run.

use recpost_common::config::AppConfig;
use recpost_pipeline::cleanup::check_year_literal;
use recpost_pipeline::transcode::FfmpegEncoder;
use recpost_pipeline::upload::Credential;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("recpost System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;

    // Encoder
    let encoder = FfmpegEncoder::new(config.encoder.clone());
    let program = &encoder.config().program;
    if encoder.is_available().await {
        println!("[OK] Encoder: {program}");
    } else {
        println!("[FAIL] Encoder not found: {program}");
        ready = false;
    }

    // Upload credential
    let var = &config.upload.token_env;
    if Credential::from_env(var).is_some() {
        println!("[OK] Upload credential: {var} is set");
    } else {
        println!("[WARN] Upload credential: {var} is not set (upload will fail)");
    }

    // Directories
    for (label, dir) in [
        ("Output directory", &config.paths.output_dir),
        ("Screenshots directory", &config.paths.screenshots_dir),
    ] {
        if dir.is_dir() {
            println!("[OK] {label}: {}", dir.display());
        } else {
            println!("[WARN] {label} missing: {}", dir.display());
        }
    }
    println!(
        "     Docs screenshots: {}",
        config.paths.docs_screenshots_dir.display()
    );

    // Stale-folder pattern
    let pattern = &config.paths.stale_folder_pattern;
    match check_year_literal(pattern) {
        Some(year) => println!(
            "[WARN] Stale folder pattern '{pattern}' only matches year {year}; update it"
        ),
        None => println!("[OK] Stale folder pattern: {pattern}"),
    }

    println!();
    if ready {
        println!("recpost is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
