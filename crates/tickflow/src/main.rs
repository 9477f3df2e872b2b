//! tickflow - event-driven workflow engine host
//!
//! Main entry point for the tickflow CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check, new, run, templates};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// tickflow - run event-driven workflows from an engine document
#[derive(Parser)]
#[command(name = "tickflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rotating JSON log files
    #[arg(long, global = true, env = "TICKFLOW_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an engine document until Ctrl-C
    Run(run::RunArgs),

    /// Validate an engine document without running it
    Check(check::CheckArgs),

    /// List the available task templates
    Templates(templates::TemplatesArgs),

    /// Write a starter engine document
    New(new::NewArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + optional rotating JSON file
    let filter = if cli.verbose {
        "tickflow=debug,tickflow_engine=debug,tickflow_tasks=debug,tickflow_config=debug,info"
    } else {
        "tickflow=info,tickflow_engine=info,tickflow_tasks=info,warn"
    };
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "tickflow.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "tickflow=trace,tickflow_engine=trace,tickflow_tasks=trace,tickflow_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
        Commands::Templates(args) => templates::run(args, &ctx).await,
        Commands::New(args) => new::run(args, &ctx).await,
    }
}
