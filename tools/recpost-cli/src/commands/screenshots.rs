//! Copy screenshots into the docs asset tree.

use recpost_common::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = super::pipeline(config);
    let paths = &pipeline.config().paths;
    println!(
        "Moving screenshots: {} -> {}",
        paths.screenshots_dir.display(),
        paths.docs_screenshots_dir.display()
    );

    let report = pipeline.relocate_screenshots().await?;
    if report.attempted() == 0 {
        println!("No screenshots found to move");
        return Ok(());
    }

    for target in report.successes() {
        println!("  Copied -> {}", target.display());
    }
    super::print_failures(&report);
    println!("Moved {report} screenshot(s)");

    Ok(())
}
