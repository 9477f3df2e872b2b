//! Tasks: the stages of a workflow pipeline.
//!
//! A concrete task implements [`Task`] by embedding a [`TaskCore`] and
//! overriding whichever of the `on_init`/`on_tick`/`on_exit` hooks it needs.
//! The provided `init`/`tick`/`exit` methods wrap those hooks: an `Err` or a
//! panic from a hook never escapes, it is recorded as `is_ok() == false` and
//! `last_error()` on the task.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tickflow_config::TaskSpec;

use crate::error::TaskError;
use crate::workflow::Workflow;

/// State shared by every task: its configuration, its last outcome and the
/// back-reference to the owning workflow.
#[derive(Debug)]
pub struct TaskCore {
    spec: TaskSpec,
    is_ok: bool,
    last_error: String,
    workflow: Weak<Workflow>,
}

impl TaskCore {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            is_ok: true,
            last_error: String::new(),
            workflow: Weak::new(),
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut TaskSpec {
        &mut self.spec
    }

    pub fn is_ok(&self) -> bool {
        self.is_ok
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Mark the task healthy and forget the last error.
    pub fn reset(&mut self) {
        self.is_ok = true;
        self.last_error.clear();
    }

    /// Mark the last outcome healthy. The last error text is kept for display.
    pub fn recover(&mut self) {
        if !self.is_ok {
            tracing::debug!(task = %self.spec.name, "task recovered");
        }
        self.is_ok = true;
    }

    /// Mark the task failed. Logs only on the healthy to failed transition.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        if self.is_ok {
            tracing::warn!(task = %self.spec.name, template = %self.spec.template, error = %error, "task failed");
        }
        self.is_ok = false;
        self.last_error = error;
    }

    /// The owning workflow, if still attached and alive.
    pub fn workflow(&self) -> Option<Arc<Workflow>> {
        self.workflow.upgrade()
    }

    /// The owning workflow, or [`TaskError::Detached`].
    pub fn owner(&self) -> Result<Arc<Workflow>, TaskError> {
        self.workflow().ok_or(TaskError::Detached)
    }

    /// Attach to a workflow; an empty handle detaches.
    pub fn attach(&mut self, workflow: Weak<Workflow>) {
        self.workflow = workflow;
    }

    pub fn is_attached(&self) -> bool {
        self.workflow.strong_count() > 0
    }
}

impl Default for TaskCore {
    fn default() -> Self {
        Self::new(TaskSpec::default())
    }
}

/// A pipeline stage.
pub trait Task: Any + Send + Sync {
    fn core(&self) -> &TaskCore;

    fn core_mut(&mut self) -> &mut TaskCore;

    /// Setup, e.g. parse the argument string. Called after `is_ok` is reset.
    fn on_init(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// One unit of work. Must not block. Failures are reported by returning
    /// `Err`; a successful return marks the task healthy again.
    fn on_tick(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    fn on_exit(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    fn init(&mut self) {
        self.core_mut().reset();
        let outcome = guarded(|| self.on_init());
        record(self.core_mut(), outcome);
    }

    fn tick(&mut self) {
        let outcome = guarded(|| self.on_tick());
        record(self.core_mut(), outcome);
    }

    fn exit(&mut self) {
        let outcome = guarded(|| self.on_exit());
        record(self.core_mut(), outcome);
    }

    fn name(&self) -> &str {
        &self.core().spec().name
    }

    fn template(&self) -> &str {
        &self.core().spec().template
    }

    fn spec(&self) -> &TaskSpec {
        self.core().spec()
    }

    fn is_ok(&self) -> bool {
        self.core().is_ok()
    }

    fn last_error(&self) -> &str {
        self.core().last_error()
    }

    fn workflow(&self) -> Option<Arc<Workflow>> {
        self.core().workflow()
    }

    fn attach_workflow(&mut self, workflow: Weak<Workflow>) {
        self.core_mut().attach(workflow);
    }
}

/// Borrow a task as its concrete type.
pub fn downcast_task<T: Task>(task: &dyn Task) -> Option<&T> {
    (task as &dyn Any).downcast_ref::<T>()
}

fn guarded<F>(hook: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn record(core: &mut TaskCore, outcome: Result<(), String>) {
    match outcome {
        Ok(()) => core.recover(),
        Err(error) => core.fail(error),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "unknown panic"
    }
}

/// The base task. Does nothing and never fails.
///
/// Used when no factory claims a task's template, and for task types the
/// engine does not execute.
#[derive(Debug, Default)]
pub struct InertTask {
    core: TaskCore,
}

impl InertTask {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            core: TaskCore::new(spec),
        }
    }
}

impl Task for InertTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }
}

/// Snapshot of a task's health for supervisors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub name: String,
    pub template: String,
    pub is_ok: bool,
    pub last_error: String,
}

impl TaskStatus {
    pub fn of(task: &dyn Task) -> Self {
        Self {
            name: task.name().to_string(),
            template: task.template().to_string(),
            is_ok: task.is_ok(),
            last_error: task.last_error().to_string(),
        }
    }
}
