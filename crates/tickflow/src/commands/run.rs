//! Run command - drives an engine document until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Engine document to run
    #[arg(short, long, env = "TICKFLOW_CONFIG")]
    pub config: PathBuf,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration: Option<u64>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let mut server = super::load_server(&args.config)?;
    let dim = Style::new().dim();

    server.init();
    println!(
        "Running {} ({} workflows, {} events)",
        Style::new().bold().apply_to(server.name()),
        server.workflows().len(),
        server.events().events().len()
    );

    match args.duration {
        Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
        None => {
            println!("{}", dim.apply_to("Press Ctrl-C to stop."));
            tokio::signal::ctrl_c().await?;
        }
    }

    tracing::info!(server = %server.name(), "shutting down");
    server.exit();

    let mut failed = 0;
    for workflow in server.workflows() {
        for status in workflow.task_status() {
            if status.is_ok {
                if ctx.verbose {
                    println!("  {} {}/{}", dim.apply_to("ok"), workflow.name(), status.name);
                }
                continue;
            }
            failed += 1;
            println!(
                "  {} {}/{}: {}",
                Style::new().yellow().apply_to("failed"),
                workflow.name(),
                status.name,
                status.last_error
            );
        }
    }
    if failed == 0 {
        println!("Stopped.");
    } else {
        println!("Stopped with {failed} failed task(s).");
    }

    Ok(())
}
