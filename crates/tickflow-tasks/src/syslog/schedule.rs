use std::sync::Arc;

use clap::Parser;
use tickflow_config::TaskSpec;
use tickflow_engine::{Task, TaskCore, TaskError};

use super::SyslogList;
use crate::args::parse_arguments;

#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct ScheduleArgs {
    /// Name of the workflow to run for each message
    #[arg(short = 'N', long, default_value = "")]
    name: String,
}

/// Forwards syslog messages to another workflow.
///
/// For each message in its own workflow's [`SyslogList`], puts that message
/// in the target workflow's data slot and ticks the target once. The target
/// runs on the calling thread and must not be this task's own workflow. A
/// longer forwarding cycle back into a workflow that is already ticking
/// fails the task.
pub struct RunSyslogSchedule {
    core: TaskCore,
    target: String,
}

impl RunSyslogSchedule {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
            target: String::new(),
        }
    }

    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self::new(spec.clone()))
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Task for RunSyslogSchedule {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_init(&mut self) -> Result<(), TaskError> {
        let args: ScheduleArgs = parse_arguments(self.core.spec())?;
        if args.name.is_empty() {
            return Err(TaskError::InvalidArguments("no target workflow name given".into()));
        }
        self.target = args.name;
        Ok(())
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        if self.target.is_empty() {
            return Err(TaskError::InvalidArguments("no target workflow name given".into()));
        }
        let workflow = self.core.owner()?;
        let target = workflow
            .get_workflow(&self.target)
            .ok_or_else(|| TaskError::Failed(format!("no workflow named '{}'", self.target)))?;
        if Arc::ptr_eq(&workflow, &target) {
            return Err(TaskError::InvalidArguments(format!(
                "workflow '{}' cannot forward to itself",
                self.target
            )));
        }

        let messages = workflow
            .data::<SyslogList>()
            .map(|list| list.clone())
            .ok_or_else(|| TaskError::MissingData("no syslog list in workflow".into()))?;
        for message in messages {
            target.init_data(message);
            target
                .try_tick()
                .map_err(|e| TaskError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}
