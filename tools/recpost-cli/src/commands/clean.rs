//! Remove stale capture folders.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let paths = &pipeline.config().paths;
    println!(
        "Cleaning folders matching '{}' in: {}",
        paths.stale_folder_pattern,
        paths.output_dir.display()
    );

    let report = pipeline.clean_stale().await?;
    for folder in report.successes() {
        println!("  Removed {}", folder.display());
    }
    super::print_failures(&report);
    println!("Removed {report} folder(s)");

    Ok(())
}
