//! Check command - reports wiring problems in an engine document.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use tickflow_engine::{TaskType, WorkflowServer};

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Engine document to check
    #[arg(short, long, env = "TICKFLOW_CONFIG")]
    pub config: PathBuf,
}

/// Problems that would leave part of the document idle at run time.
pub fn problems(server: &WorkflowServer) -> Vec<String> {
    let factories = server.factories();
    let mut found = Vec::new();

    for workflow in server.workflows() {
        let start_event = workflow.start_event();
        if server.events().event(&start_event).is_none() {
            found.push(format!(
                "workflow '{}': start event '{}' does not exist",
                workflow.name(),
                start_event
            ));
        }
        for task in workflow.tasks() {
            if task.task_type != TaskType::Internal {
                found.push(format!(
                    "workflow '{}': task '{}' has type {} which is not executed",
                    workflow.name(),
                    task.name,
                    task.task_type
                ));
            } else if !factories.iter().any(|f| f.has_template(&task.template)) {
                found.push(format!(
                    "workflow '{}': task '{}' uses unknown template '{}'",
                    workflow.name(),
                    task.name,
                    task.template
                ));
            }
        }
    }
    found
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let server = super::load_server(&args.config)?;
    let problems = problems(&server);

    if problems.is_empty() {
        println!(
            "{} {}",
            Style::new().green().apply_to("ok"),
            args.config.display()
        );
        if ctx.verbose {
            for workflow in server.workflows() {
                println!(
                    "  {} <- {} ({} tasks)",
                    workflow.name(),
                    workflow.start_event(),
                    workflow.task_count()
                );
            }
        }
        return Ok(());
    }

    let yellow = Style::new().yellow();
    for problem in &problems {
        println!("{} {}", yellow.apply_to("warning:"), problem);
    }
    bail!("{} problem(s) found in {}", problems.len(), args.config.display())
}
