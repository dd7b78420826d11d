//! Run every post-processing stage in order.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let output_dir = pipeline.config().paths.output_dir.display();
    println!("Starting post-processing in: {output_dir}");

    let summary = pipeline.run().await?;

    println!();
    for (stage, outcome) in summary.stages() {
        println!("  {stage:<10} {outcome}");
    }
    for asset in &summary.assets {
        println!("  {} -> {}", asset.key, asset.url);
    }
    println!("\nPost-processing complete.");

    Ok(())
}
