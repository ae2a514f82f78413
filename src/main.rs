// ABOUTME: Entry point for the slipway CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use slipway::config::{self, Config};
use slipway::diagnostics::Diagnostics;
use slipway::error::{Error, Result};
use slipway::output::{Output, OutputMode};
use slipway::pipeline::{CleanupOutcome, DeploymentContext, Orchestrator};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Local parent directory for synced working copies.
const CHECKOUTS_DIR: &str = ".slipway/checkouts";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let result = run(cli, Output::new(mode)).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            deploy(config, cwd.join(CHECKOUTS_DIR), output).await
        }
        Commands::Cleanup => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            cleanup(config, output).await
        }
        Commands::Status => {
            let cwd = env::current_dir()?;
            let config = Config::discover(&cwd)?;
            let ctx = DeploymentContext::from_config(&config)?;
            println!("App:        {}", ctx.app);
            println!("Repository: {} @ {}", ctx.repo_url, ctx.revision);
            println!("Server:     {}@{}:{}", ctx.user, ctx.host, ctx.ssh_port);
            println!("Port:       {}", ctx.port);
            println!(
                "Domain:     {}",
                ctx.domain.as_deref().unwrap_or("(none, catch-all)")
            );
            Ok(())
        }
    }
}

/// Run the deployment pipeline once, fail-fast.
async fn deploy(config: Config, checkout_parent: PathBuf, mut output: Output) -> Result<()> {
    let ctx = DeploymentContext::from_config(&config)?;
    let orchestrator = Orchestrator::new(ctx);
    let mut diagnostics = Diagnostics::default();

    output.start_timer();

    let result = orchestrator
        .run(&checkout_parent, &output, &mut diagnostics)
        .await;

    for warning in diagnostics.warnings() {
        eprintln!("Warning: {}", warning.message);
    }

    match result {
        Ok(summary) => {
            output.success(&format!(
                "Deployed {} @ {} ({}) at {}",
                summary.app, summary.head, summary.kind, summary.url
            ));
            Ok(())
        }
        Err(failure) => {
            output.error(&failure.to_string());
            Err(Error::Deploy {
                stage: failure.stage.to_string(),
                reason: failure.error.to_string(),
            })
        }
    }
}

/// Best-effort teardown of a previous deployment.
async fn cleanup(config: Config, mut output: Output) -> Result<()> {
    let ctx = DeploymentContext::from_config(&config)?;
    let orchestrator = Orchestrator::new(ctx);
    let mut diagnostics = Diagnostics::default();

    output.start_timer();

    let report = orchestrator.cleanup(&output, &mut diagnostics).await?;

    for warning in diagnostics.warnings() {
        eprintln!("Warning: {}", warning.message);
    }

    let applied = report
        .steps
        .iter()
        .filter(|s| s.outcome == CleanupOutcome::Applied)
        .count();
    output.success(&format!(
        "Cleanup finished: {} of {} steps applied",
        applied,
        report.steps.len()
    ));

    Ok(())
}
