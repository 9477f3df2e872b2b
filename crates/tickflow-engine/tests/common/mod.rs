//! Common test tasks for integration tests.

#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tickflow_engine::{Task, TaskCore, TaskError, TaskSpec, TemplateFactory, Workflow};

/// Ordered list of task names that ticked, kept in the workflow data slot.
pub type TickLog = Vec<String>;

/// Wall-clock instants of each tick, kept in the workflow data slot.
pub type TickTimes = Vec<Duration>;

fn append(workflow: &Workflow, name: &str) {
    if workflow.data::<TickLog>().is_none() {
        workflow.init_data(TickLog::new());
    }
    if let Some(mut log) = workflow.data::<TickLog>() {
        log.push(name.to_string());
    }
}

/// Appends its name to the workflow's [`TickLog`].
pub struct Recorder {
    core: TaskCore,
}

impl Recorder {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
        })
    }
}

impl Task for Recorder {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let workflow = self.core.owner()?;
        append(&workflow, &self.core.spec().name);
        Ok(())
    }
}

/// Appends its name to the [`TickLog`], then fails.
pub struct Failing {
    core: TaskCore,
}

impl Failing {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
        })
    }
}

impl Task for Failing {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let workflow = self.core.owner()?;
        append(&workflow, &self.core.spec().name);
        Err(TaskError::Failed("always fails".into()))
    }
}

/// Writes its argument string into the sibling workflow named by its
/// description.
pub struct Forwarder {
    core: TaskCore,
}

impl Forwarder {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
        })
    }
}

impl Task for Forwarder {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let spec = self.core.spec();
        let sibling = self.core.owner()?
            .get_workflow(&spec.description)
            .ok_or_else(|| TaskError::Failed(format!("no workflow '{}'", spec.description)))?;
        sibling.init_data(spec.arguments.clone());
        Ok(())
    }
}

/// Appends its name to the [`TickLog`], but only once `init` has run.
pub struct Primed {
    core: TaskCore,
    ready: bool,
}

impl Primed {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
            ready: false,
        })
    }
}

impl Task for Primed {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_init(&mut self) -> Result<(), TaskError> {
        self.ready = true;
        Ok(())
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        if !self.ready {
            return Err(TaskError::Failed("not initialized".into()));
        }
        let workflow = self.core.owner()?;
        append(&workflow, &self.core.spec().name);
        Ok(())
    }
}

/// Ticks the sibling workflow named by its description.
pub struct Relay {
    core: TaskCore,
}

impl Relay {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
        })
    }
}

impl Task for Relay {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let target = &self.core.spec().description;
        let sibling = self.core.owner()?
            .get_workflow(target)
            .ok_or_else(|| TaskError::Failed(format!("no workflow '{target}'")))?;
        sibling.try_tick().map_err(|e| TaskError::Failed(e.to_string()))
    }
}

/// Records the wall-clock instant of each tick.
pub struct Stamper {
    core: TaskCore,
}

impl Stamper {
    pub fn boxed(spec: &TaskSpec) -> Box<dyn Task> {
        Box::new(Self {
            core: TaskCore::new(spec.clone()),
        })
    }
}

impl Task for Stamper {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn on_tick(&mut self) -> Result<(), TaskError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TaskError::Failed(e.to_string()))?;
        let workflow = self.core.owner()?;
        if workflow.data::<TickTimes>().is_none() {
            workflow.init_data(TickTimes::new());
        }
        if let Some(mut times) = workflow.data::<TickTimes>() {
            times.push(now);
        }
        Ok(())
    }
}

/// Factory offering `Record`, `Fail`, `Forward`, `Stamp`, `Prime` and `Relay`.
pub fn test_factory() -> TemplateFactory {
    TemplateFactory::new("Test", "Tasks for integration tests")
        .with_template(TaskSpec::new("", "Record"), Recorder::boxed)
        .with_template(TaskSpec::new("", "Fail"), Failing::boxed)
        .with_template(TaskSpec::new("", "Forward"), Forwarder::boxed)
        .with_template(TaskSpec::new("", "Stamp"), Stamper::boxed)
        .with_template(TaskSpec::new("", "Prime"), Primed::boxed)
        .with_template(TaskSpec::new("", "Relay"), Relay::boxed)
}

/// Names in the workflow's tick log.
pub fn tick_log(workflow: &Workflow) -> TickLog {
    workflow
        .data::<TickLog>()
        .map(|log| log.clone())
        .unwrap_or_default()
}

pub fn tick_times(workflow: &Workflow) -> TickTimes {
    workflow
        .data::<TickTimes>()
        .map(|times| times.clone())
        .unwrap_or_default()
}
