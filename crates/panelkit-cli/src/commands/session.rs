use anyhow::Result;
use clap::{Args, Subcommand};
use panelkit_application::Studio;
use panelkit_core::session::{Session, SessionConfig};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List sessions, most recently updated first
    List,
    /// Show the current session
    Show,
    /// Create a session
    New(NewSession),
    /// Make a session current
    Switch { id: String },
    /// Rename a session
    Rename { id: String, name: String },
    /// Delete a session (the last one cannot be deleted)
    Delete { id: String },
    /// Delete every session and start over
    Clear,
}

#[derive(Args)]
pub struct NewSession {
    /// Name; defaults to "session N"
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    page_count: Option<u32>,
    #[arg(long)]
    rows_per_page: Option<u32>,
    /// Stay on the current session instead of switching to the new one
    #[arg(long)]
    no_switch: bool,
}

impl NewSession {
    fn config(&self, defaults: &SessionConfig) -> Option<SessionConfig> {
        if self.style.is_none()
            && self.language.is_none()
            && self.page_count.is_none()
            && self.rows_per_page.is_none()
        {
            return None;
        }
        Some(SessionConfig {
            style: self.style.clone().unwrap_or_else(|| defaults.style.clone()),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| defaults.language.clone()),
            page_count: self.page_count.unwrap_or(defaults.page_count),
            rows_per_page: self.rows_per_page.unwrap_or(defaults.rows_per_page),
        })
    }
}

pub async fn run(studio: &Studio, action: SessionAction) -> Result<()> {
    match action {
        SessionAction::List => {
            let current = studio.current_session().await.id;
            for session in studio.list_sessions().await {
                let marker = if session.id == current { "*" } else { " " };
                println!("{marker} {}", summary(&session));
            }
        }
        SessionAction::Show => print_session(&studio.current_session().await),
        SessionAction::New(args) => {
            let defaults = studio.session_defaults().await;
            let session = studio
                .create_session(&args.name, args.config(&defaults))
                .await?;
            if !args.no_switch {
                studio.switch_session(&session.id).await?;
            }
            println!("Created {}", summary(&session));
        }
        SessionAction::Switch { id } => {
            let session = studio.switch_session(&id).await?;
            println!("Switched to {}", summary(&session));
        }
        SessionAction::Rename { id, name } => {
            studio.rename_session(&id, &name).await?;
            println!("Renamed {id}");
        }
        SessionAction::Delete { id } => {
            studio.delete_session(&id).await?;
            println!("Deleted {id}");
        }
        SessionAction::Clear => {
            let session = studio.clear_all_sessions().await?;
            println!("Cleared all sessions, now on {}", summary(&session));
        }
    }
    Ok(())
}

fn summary(session: &Session) -> String {
    format!(
        "{}  {}  ({} pages, {} with images, updated {})",
        session.id,
        session.name,
        session.pages.count(),
        session.artifacts.len(),
        session.updated_at.format("%Y-%m-%d %H:%M")
    )
}

fn print_session(session: &Session) {
    println!("{}", session.name);
    println!("  id:            {}", session.id);
    println!("  style:         {}", session.config.style);
    println!("  language:      {}", session.config.language);
    println!("  page count:    {}", session.config.page_count);
    println!("  rows per page: {}", session.config.rows_per_page);
    if !session.prompt_text.is_empty() {
        println!("  prompt:        {}", session.prompt_text);
    }
    if session.user_reference_image.is_some() {
        println!("  reference image set");
    }
    if !session.pages.is_empty() {
        println!(
            "  page {}/{}",
            session.pages.current_index() + 1,
            session.pages.count()
        );
    }
}
