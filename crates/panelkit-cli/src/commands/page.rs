use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use panelkit_application::{PageMove, Studio};

use super::to_index;

#[derive(Subcommand)]
pub enum PageAction {
    /// Replace the pages with a JSON page script ("-" reads stdin)
    Import { file: PathBuf },
    /// Print the current page
    Show,
    /// Move to the next page
    Next,
    /// Move to the previous page
    Prev,
    /// Jump to page NUMBER (1-based)
    Goto { number: usize },
    /// Set the text of one panel on the current page (1-based row and panel)
    Edit {
        row: usize,
        panel: usize,
        text: String,
    },
}

pub async fn run(studio: &Studio, action: PageAction) -> Result<()> {
    match action {
        PageAction::Import { file } => {
            let json = read_input(&file)?;
            let count = studio.import_pages(&json).await?;
            println!("Imported {count} page(s)");
        }
        PageAction::Show => show_current(studio).await,
        PageAction::Next => report_move(studio.move_page(PageMove::Next).await?, "last"),
        PageAction::Prev => report_move(studio.move_page(PageMove::Prev).await?, "first"),
        PageAction::Goto { number } => {
            studio
                .move_page(PageMove::To(to_index(number, "Page")?))
                .await?;
            show_current(studio).await;
        }
        PageAction::Edit { row, panel, text } => {
            studio
                .edit_panel_text(to_index(row, "Row")?, to_index(panel, "Panel")?, &text)
                .await?;
            show_current(studio).await;
        }
    }
    Ok(())
}

fn read_input(file: &PathBuf) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("Failed to read page script from stdin")?;
        return Ok(json);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read page script {}", file.display()))
}

fn report_move(moved: bool, boundary: &str) {
    if !moved {
        println!("Already on the {boundary} page");
    }
}

async fn show_current(studio: &Studio) {
    let session = studio.current_session().await;
    let Some(page) = session.pages.current() else {
        println!("No pages");
        return;
    };
    let index = session.pages.current_index();
    println!(
        "Page {}/{}: {}",
        index + 1,
        session.pages.count(),
        page.display_title(index)
    );
    for (r, row) in page.rows.iter().enumerate() {
        for (p, panel) in row.panels.iter().enumerate() {
            println!("  [{}.{}] {}", r + 1, p + 1, panel.text);
        }
    }
    if let Some(version) = session.artifacts.get_current(index) {
        println!(
            "  image v{}: {}",
            version.version_number, version.image_reference
        );
    }
}
