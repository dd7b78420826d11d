//! Upload processed videos.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let output_dir = pipeline.config().paths.output_dir.display();
    println!("Uploading videos from: {output_dir}");

    let report = pipeline.upload().await?;
    if report.attempted() == 0 {
        println!("No .mp4 files found in output directory");
        return Ok(());
    }

    for asset in report.successes() {
        println!("  Uploaded {} -> {}", asset.key, asset.url);
    }
    super::print_failures(&report);
    println!("Upload complete: {report} files uploaded successfully");

    Ok(())
}
