use anyhow::{Result, bail};
use clap::Subcommand;
use panelkit_application::{GenerationOutcome, Studio};
use panelkit_core::session::SessionPatch;

#[derive(Subcommand)]
pub enum PromptAction {
    /// Set the story prompt
    Set { text: String },
    /// Rewrite the prompt into a more detailed one (keeps it on failure)
    Optimize,
    /// Write the session's pages from the prompt, replacing pages and images
    Generate,
    /// Set or clear (no argument) the reference image used for every page
    Reference { image: Option<String> },
}

pub async fn run(studio: &Studio, action: PromptAction) -> Result<()> {
    match action {
        PromptAction::Set { text } => {
            studio
                .update_current(SessionPatch {
                    prompt_text: Some(text),
                    ..Default::default()
                })
                .await?;
        }
        PromptAction::Optimize => {
            let prompt = studio.optimize_prompt().await?;
            println!("{prompt}");
        }
        PromptAction::Generate => match studio.generate_pages().await? {
            GenerationOutcome::Finished(count) => {
                let session = studio.current_session().await;
                println!("Wrote {count} page(s) for \"{}\"", session.name);
                for (index, page) in session.pages.pages().iter().enumerate() {
                    println!("  {}. {}", index + 1, page.display_title(index));
                }
            }
            GenerationOutcome::Rejected => bail!("A generation is already running"),
        },
        PromptAction::Reference { image } => {
            let cleared = image.is_none();
            studio
                .update_current(SessionPatch {
                    user_reference_image: Some(image),
                    ..Default::default()
                })
                .await?;
            if cleared {
                println!("Reference image cleared");
            }
        }
    }
    Ok(())
}
