//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod repo;

pub use pipeline::PipelineCommands;
pub use repo::RepoCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline management
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Container repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

/// Route a command to its handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Repo { command } => repo::handle_repo_command(command, config).await,
    }
}
