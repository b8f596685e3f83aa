//! scout CLI - discover the pages of a site worth auditing
//!
//! The binary is a thin wrapper around [`scout_core::discover_routes`] using
//! the bundled HTTP renderer.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod output;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::FileConfig;
use crate::utils::initialize_logging;

/// Execute the scout CLI with the current process arguments.
///
/// # Errors
///
/// Returns an error if logging setup, config loading or the command fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let file = FileConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Discover(args) => commands::discover(args, &file, cli.quiet).await,
        Commands::Robots {
            url,
            user_agent_token,
            format,
        } => commands::robots(url, user_agent_token.as_deref(), &file, *format).await,
        Commands::Sitemap { url, limit, format } => {
            commands::sitemap(url, *limit, &file, *format, cli.quiet).await
        }
    }
}
