use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use panelkit_application::Studio;
use panelkit_infrastructure::AppConfig;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "panelkit")]
#[command(about = "Panelkit - manage illustrated story sessions and generate their pages", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Edit and navigate the current session's pages
    Page {
        #[command(subcommand)]
        action: commands::page::PageAction,
    },
    /// Set or refine the current session's story prompt
    Prompt {
        #[command(subcommand)]
        action: commands::prompt::PromptAction,
    },
    /// Generate page images for the current session
    Generate {
        #[command(subcommand)]
        action: commands::generate::GenerateAction,
    },
    /// Inspect and select generated versions
    Artifact {
        #[command(subcommand)]
        action: commands::artifact::ArtifactAction,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let studio = Studio::from_config(&config).await?;

    match cli.command {
        Commands::Session { action } => commands::session::run(&studio, action).await?,
        Commands::Page { action } => commands::page::run(&studio, action).await?,
        Commands::Prompt { action } => commands::prompt::run(&studio, action).await?,
        Commands::Generate { action } => commands::generate::run(&studio, action).await?,
        Commands::Artifact { action } => commands::artifact::run(&studio, action).await?,
        Commands::Config => {}
    }

    Ok(())
}
