// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slipway")]
#[command(about = "Provision a host and deploy a containerized app behind nginx")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON event lines instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a slipway.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Run the full deployment pipeline against the configured host
    Deploy,

    /// Tear down everything a previous deploy created on the host
    Cleanup,

    /// Show the resolved configuration
    Status,
}
