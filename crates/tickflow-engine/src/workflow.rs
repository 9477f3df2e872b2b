//! Workflows: ordered task pipelines sharing one data slot.

use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard, RwLock};
use tickflow_config::{TaskSpec, TaskType, WorkflowSpec};

use crate::error::{EngineError, Result};
use crate::factory::TaskFactory;
use crate::server::ServerShared;
use crate::task::{InertTask, Task, TaskStatus, downcast_task};

/// An ordered list of tasks ticked together, plus a single typed payload the
/// tasks hand data through.
///
/// Workflows are always held in an [`Arc`]; tasks and events keep weak
/// handles back to them. The task list and the data slot each have their
/// own lock so a workflow can be shared with event threads. The locks do not
/// order ticks coming from different events.
///
/// The task list is locked for the whole tick. A tick that reaches back into
/// a workflow already ticking on the same thread, directly or through a chain
/// of siblings, is refused by [`Workflow::try_tick`].
pub struct Workflow {
    name: String,
    initialized: AtomicBool,
    description: RwLock<String>,
    start_event: RwLock<String>,
    tasks: Mutex<Vec<Box<dyn Task>>>,
    data: Mutex<Option<Box<dyn Any + Send>>>,
    server: Weak<ServerShared>,
    self_ref: Weak<Workflow>,
}

impl Workflow {
    /// A workflow that belongs to no server. Tasks added to it by spec are
    /// inert, and sibling lookups find nothing.
    pub fn standalone(name: impl Into<String>) -> Arc<Self> {
        Self::build(&WorkflowSpec::new(name), Weak::new())
    }

    pub(crate) fn build(spec: &WorkflowSpec, server: Weak<ServerShared>) -> Arc<Self> {
        let workflow = Arc::new_cyclic(|self_ref| Self {
            name: spec.name.clone(),
            initialized: AtomicBool::new(false),
            description: RwLock::new(spec.description.clone()),
            start_event: RwLock::new(spec.start_event.clone()),
            tasks: Mutex::new(Vec::new()),
            data: Mutex::new(None),
            server,
            self_ref: self_ref.clone(),
        });
        for task in &spec.tasks {
            workflow.add_task(task.clone());
        }
        workflow
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> String {
        self.description.read().clone()
    }

    pub fn set_description(&self, description: impl Into<String>) {
        *self.description.write() = description.into();
    }

    /// Name of the event that drives this workflow.
    pub fn start_event(&self) -> String {
        self.start_event.read().clone()
    }

    /// Takes effect on the next server `init()`.
    pub fn set_start_event(&self, event: impl Into<String>) {
        *self.start_event.write() = event.into();
    }

    pub fn to_spec(&self) -> WorkflowSpec {
        WorkflowSpec {
            name: self.name.clone(),
            description: self.description(),
            start_event: self.start_event(),
            tasks: self.tasks(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    /// Append a task built from `spec` by the owning server's factories.
    /// Without a server, or when no factory claims the template, the task is
    /// an [`InertTask`].
    pub fn add_task(&self, spec: TaskSpec) {
        let task = match self.server.upgrade() {
            Some(server) => server.create_task(&spec),
            None => Box::new(InertTask::new(spec)),
        };
        self.push_task(task);
    }

    /// Append an already built task.
    pub fn push_task(&self, task: Box<dyn Task>) {
        self.tasks.lock().push(task);
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Configuration of every task, in execution order.
    pub fn tasks(&self) -> Vec<TaskSpec> {
        self.tasks.lock().iter().map(|t| t.spec().clone()).collect()
    }

    /// Health of every task, in execution order.
    pub fn task_status(&self) -> Vec<TaskStatus> {
        self.tasks
            .lock()
            .iter()
            .map(|t| TaskStatus::of(t.as_ref()))
            .collect()
    }

    /// Lock the task list and borrow the first task named `name`.
    pub fn task(&self, name: &str) -> Option<MappedMutexGuard<'_, dyn Task + 'static>> {
        MutexGuard::try_map(self.tasks.lock(), |tasks| {
            tasks
                .iter_mut()
                .find(|t| t.name().eq_ignore_ascii_case(name))
                .map(|t| t.as_mut())
        })
        .ok()
    }

    /// Lock the task list and borrow the first task created from `template`.
    pub fn task_by_template(&self, template: &str) -> Option<MappedMutexGuard<'_, dyn Task + 'static>> {
        MutexGuard::try_map(self.tasks.lock(), |tasks| {
            tasks
                .iter_mut()
                .find(|t| t.template().eq_ignore_ascii_case(template))
                .map(|t| t.as_mut())
        })
        .ok()
    }

    /// Remove the first task named `name`, detaching it.
    pub fn delete_task(&self, name: &str) -> Option<Box<dyn Task>> {
        let mut tasks = self.tasks.lock();
        let index = tasks
            .iter()
            .position(|t| t.name().eq_ignore_ascii_case(name))?;
        let mut task = tasks.remove(index);
        task.attach_workflow(Weak::new());
        Some(task)
    }

    /// Swap the named task with the one before it. No-op at the front.
    pub fn move_up(&self, name: &str) {
        let mut tasks = self.tasks.lock();
        if let Some(index) = tasks.iter().position(|t| t.name().eq_ignore_ascii_case(name))
            && index > 0
        {
            tasks.swap(index - 1, index);
        }
    }

    /// Swap the named task with the one after it. No-op at the back.
    pub fn move_down(&self, name: &str) {
        let mut tasks = self.tasks.lock();
        if let Some(index) = tasks.iter().position(|t| t.name().eq_ignore_ascii_case(name))
            && index + 1 < tasks.len()
        {
            tasks.swap(index, index + 1);
        }
    }

    /// Rebuild inert tasks whose template `factory` now claims. Returns the
    /// number of tasks replaced.
    ///
    /// On an initialized workflow the replacements are attached and
    /// initialized, as `init` would have done.
    pub(crate) fn resolve_templates(&self, factory: &dyn TaskFactory) -> usize {
        let initialized = self.is_initialized();
        let mut replaced = 0;
        for task in self.tasks.lock().iter_mut() {
            let inert = downcast_task::<InertTask>(task.as_ref()).is_some();
            if inert
                && task.spec().task_type == TaskType::Internal
                && factory.has_template(task.template())
            {
                *task = factory.create_task(task.spec());
                if initialized {
                    task.attach_workflow(self.self_ref.clone());
                    task.init();
                }
                replaced += 1;
            }
        }
        replaced
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// True between `init` and `exit`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Attach and initialize every task.
    pub fn init(&self) {
        let mut tasks = self.tasks.lock();
        for task in tasks.iter_mut() {
            task.attach_workflow(self.self_ref.clone());
            task.init();
        }
        self.initialized.store(true, Ordering::Release);
        tracing::debug!(workflow = %self.name, tasks = tasks.len(), "workflow initialized");
    }

    /// Tick every task in order. A failed task does not stop the ones after it.
    ///
    /// A re-entrant tick is skipped with a warning; see [`Workflow::try_tick`].
    pub fn tick(&self) {
        if let Err(e) = self.try_tick() {
            tracing::warn!(workflow = %self.name, error = %e, "workflow tick skipped");
        }
    }

    /// Tick every task in order, or fail with [`EngineError::ReentrantTick`]
    /// when this workflow is already ticking further up the calling thread's
    /// stack.
    pub fn try_tick(&self) -> Result<()> {
        let _active = ActiveTick::enter(self)?;
        tracing::trace!(workflow = %self.name, "workflow tick");
        for task in self.tasks.lock().iter_mut() {
            task.tick();
        }
        Ok(())
    }

    /// Exit and detach every task.
    pub fn exit(&self) {
        self.initialized.store(false, Ordering::Release);
        for task in self.tasks.lock().iter_mut() {
            task.exit();
            task.attach_workflow(Weak::new());
        }
        tracing::debug!(workflow = %self.name, "workflow exited");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Data slot
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the payload.
    pub fn init_data<T: Any + Send>(&self, value: T) {
        *self.data.lock() = Some(Box::new(value));
    }

    /// Lock and borrow the payload if it is a `T`.
    pub fn data<T: Any + Send>(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.data.lock(), |slot| {
            slot.as_mut().and_then(|value| value.downcast_mut::<T>())
        })
        .ok()
    }

    /// Remove the payload if it is a `T`. Any other payload is left in place.
    pub fn take_data<T: Any + Send>(&self) -> Option<T> {
        let mut slot = self.data.lock();
        if !slot.as_ref().is_some_and(|value| value.is::<T>()) {
            return None;
        }
        slot.take()
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn has_data(&self) -> bool {
        self.data.lock().is_some()
    }

    pub fn clear_data(&self) {
        *self.data.lock() = None;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Siblings
    // ─────────────────────────────────────────────────────────────────────

    /// Find another workflow on the same server.
    pub fn get_workflow(&self, name: &str) -> Option<Arc<Workflow>> {
        self.server.upgrade()?.workflow(name)
    }

    /// This workflow's own handle.
    pub fn handle(&self) -> Option<Arc<Workflow>> {
        self.self_ref.upgrade()
    }
}

thread_local! {
    /// Workflows ticking on this thread, outermost first.
    static TICKING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a workflow as ticking on the current thread until dropped.
struct ActiveTick(usize);

impl ActiveTick {
    fn enter(workflow: &Workflow) -> Result<Self> {
        let id = std::ptr::from_ref(workflow) as usize;
        TICKING.with_borrow_mut(|ticking| {
            if ticking.contains(&id) {
                return Err(EngineError::ReentrantTick(workflow.name.clone()));
            }
            ticking.push(id);
            Ok(Self(id))
        })
    }
}

impl Drop for ActiveTick {
    fn drop(&mut self) {
        TICKING.with_borrow_mut(|ticking| {
            if let Some(index) = ticking.iter().rposition(|id| *id == self.0) {
                ticking.remove(index);
            }
        });
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("start_event", &self.start_event())
            .field("tasks", &self.tasks())
            .field("has_data", &self.has_data())
            .finish()
    }
}
