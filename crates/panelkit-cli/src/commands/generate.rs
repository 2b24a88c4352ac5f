use anyhow::{Result, bail};
use clap::Subcommand;
use panelkit_application::{BatchStatus, GenerationOutcome, Studio};
use tokio_util::sync::CancellationToken;

#[derive(Subcommand)]
pub enum GenerateAction {
    /// Generate the current page
    Page,
    /// Generate every page in order; Ctrl-C stops after the page in flight
    All,
}

pub async fn run(studio: &Studio, action: GenerateAction) -> Result<()> {
    match action {
        GenerateAction::Page => match studio.generate_current_page().await? {
            GenerationOutcome::Finished(page) => println!(
                "Page {}: v{} {}",
                page.page_index + 1,
                page.version.version_number,
                page.version.image_reference
            ),
            GenerationOutcome::Rejected => bail!("A generation is already running"),
        },
        GenerateAction::All => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Stopping after the current page...");
                    on_interrupt.cancel();
                }
            });

            let outcome = studio.generate_all(Some(cancel)).await;
            watcher.abort();

            let report = match outcome? {
                GenerationOutcome::Finished(report) => report,
                GenerationOutcome::Rejected => bail!("A generation is already running"),
            };
            for page in &report.generated {
                println!(
                    "Page {}: v{} {}",
                    page.page_index + 1,
                    page.version.version_number,
                    page.version.image_reference
                );
            }
            match report.status {
                BatchStatus::Completed => {
                    println!("Generated all {} pages", report.total_pages)
                }
                BatchStatus::Cancelled { next_page_index } => println!(
                    "Cancelled; {} of {} pages generated, page {} not started",
                    report.generated.len(),
                    report.total_pages,
                    next_page_index + 1
                ),
                BatchStatus::PersistFailed { page_index, error } => bail!(
                    "Page {} was generated but could not be saved: {error}",
                    page_index + 1
                ),
                BatchStatus::Failed { error, .. } => bail!(
                    "{error} ({} of {} pages generated and kept)",
                    report.generated.len(),
                    report.total_pages
                ),
            }
        }
    }
    Ok(())
}
