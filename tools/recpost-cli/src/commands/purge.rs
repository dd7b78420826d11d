//! Delete leftover output files.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let output_dir = pipeline.config().paths.output_dir.display();
    println!("Cleaning up output files in: {output_dir}");

    let tally = pipeline.purge().await?;
    println!("Removed {tally} file(s)");

    Ok(())
}
