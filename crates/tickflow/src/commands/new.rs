//! New command - writes a starter engine document.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use tickflow_engine::{CYCLIC_EVENT, TaskSpec, WorkflowServer, WorkflowSpec};
use tickflow_tasks::{INIT_DIRECTORY_DATA, SCAN_DIRECTORY_DATA};

use super::Context;

/// Arguments for the new command.
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Where to write the document
    #[arg(short, long)]
    pub output: PathBuf,

    /// Engine name
    #[arg(long, default_value = "tickflow")]
    pub name: String,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

/// A server holding the default events and one directory-scan workflow.
pub fn starter(name: &str) -> Result<WorkflowServer> {
    let mut server = WorkflowServer::new(name);
    server.set_description("Starter engine");
    for factory in super::factories() {
        server.register_factory(factory);
    }
    server.add_workflow(
        &WorkflowSpec::new("DirectoryScan")
            .with_description("Lists the log files below the working directory")
            .with_start_event(CYCLIC_EVENT)
            .with_task(
                TaskSpec::new("Init", INIT_DIRECTORY_DATA)
                    .with_arguments("--root-dir=. --include-filter=*.log --exclude-filter="),
            )
            .with_task(TaskSpec::new("Scan", SCAN_DIRECTORY_DATA)),
    )?;
    Ok(server)
}

/// Run the new command.
pub async fn run(args: NewArgs, _ctx: &Context) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.output.display());
    }
    starter(&args.name)?.save(&args.output)?;
    tracing::info!(path = %args.output.display(), "starter document written");
    println!("Wrote {}", args.output.display());
    Ok(())
}
