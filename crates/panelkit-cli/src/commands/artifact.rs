use anyhow::Result;
use clap::Subcommand;
use panelkit_application::Studio;

use super::to_index;

#[derive(Subcommand)]
pub enum ArtifactAction {
    /// List every page's versions; `*` marks the current one
    List,
    /// Make VERSION (1-based position) of PAGE current
    Select { page: usize, version: usize },
}

pub async fn run(studio: &Studio, action: ArtifactAction) -> Result<()> {
    match action {
        ArtifactAction::List => {
            let entries = studio.artifacts().await;
            if entries.is_empty() {
                println!("No images generated yet");
            }
            for entry in entries {
                println!("Page {}: {}", entry.page_index() + 1, entry.page_title());
                for (i, version) in entry.versions().iter().enumerate() {
                    let marker = if i == entry.current_version_index() { "*" } else { " " };
                    println!(
                        "  {marker} v{} {} {}",
                        version.version_number,
                        version.created_at.format("%Y-%m-%d %H:%M:%S"),
                        version.image_reference
                    );
                }
            }
        }
        ArtifactAction::Select { page, version } => {
            studio
                .select_version(to_index(page, "Page")?, to_index(version, "Version")?)
                .await?;
            println!("Page {page} now shows version {version}");
        }
    }
    Ok(())
}
