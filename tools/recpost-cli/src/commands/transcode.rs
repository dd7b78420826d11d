//! Transcode raw videos.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let config = pipeline.config();
    let encoder = &config.encoder;
    let screenshots_dir = config.paths.screenshots_dir.display();
    println!("Processing videos in: {screenshots_dir}");
    println!(
        "  Encoder: {} -vcodec {} -crf {}",
        encoder.program, encoder.video_codec, encoder.crf
    );

    let report = pipeline.transcode().await?;
    if report.attempted() == 0 {
        println!("No videos found to process");
        return Ok(());
    }

    for output in report.successes() {
        println!("  Processed -> {}", output.display());
    }
    super::print_failures(&report);
    println!("Processed {report} video(s)");

    Ok(())
}
