//! Events: named triggers that tick workflows.
//!
//! Init and Exit events tick their workflows once, from `init()` and `exit()`
//! respectively. Cyclic and Periodic events own a background loop thread
//! between `init()` and `exit()`:
//!
//! - **Cyclic**: tick, then sleep one step, until stopped.
//! - **Periodic**: wait for the next wall-clock multiple of the step, tick,
//!   advance the target by one step, until stopped.
//!
//! Parameter events only tick when the engine is ticked.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex, RwLock};
use tickflow_config::{EventKind, EventSpec};

use crate::workflow::Workflow;

/// Periods below this are replaced with [`DEFAULT_STEP`].
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Step used when the configured period is too short.
pub const DEFAULT_STEP: Duration = Duration::from_millis(1000);

/// Loop step for a configured period in milliseconds.
///
/// Periods shorter than [`MIN_PERIOD`] fall back to [`DEFAULT_STEP`], not to
/// the minimum.
pub fn step_for(period_ms: u64) -> Duration {
    let period = Duration::from_millis(period_ms);
    if period < MIN_PERIOD { DEFAULT_STEP } else { period }
}

/// The first multiple of `step` strictly after `now`, both measured from the
/// Unix epoch.
pub fn next_boundary(now: Duration, step: Duration) -> Duration {
    let step_ns = step.as_nanos().max(1);
    let boundary = (now.as_nanos() / step_ns) * step_ns + step_ns;
    Duration::from_nanos(u64::try_from(boundary).unwrap_or(u64::MAX))
}

fn wall_clock() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

type WorkflowList = Arc<RwLock<Vec<Weak<Workflow>>>>;

fn tick_all(workflows: &WorkflowList) {
    // Snapshot so attach/detach never waits on a running tick.
    let live: Vec<Arc<Workflow>> = workflows.read().iter().filter_map(Weak::upgrade).collect();
    for workflow in live {
        workflow.tick();
    }
}

/// Stop flag a sleeping loop can be woken from.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    /// Sleep up to `timeout`. Returns true when stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }
}

struct EventLoop {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

/// A named trigger driving a list of workflows.
pub struct Event {
    name: String,
    description: String,
    kind: EventKind,
    period: u64,
    parameter: String,
    workflows: WorkflowList,
    running: Option<EventLoop>,
}

impl Event {
    pub fn new(name: impl Into<String>, kind: EventKind) -> Self {
        Self::from_spec(&EventSpec::new(name, kind))
    }

    pub fn from_spec(spec: &EventSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            kind: spec.kind,
            period: spec.period,
            parameter: spec.parameter.clone(),
            workflows: Arc::default(),
            running: None,
        }
    }

    pub fn with_period(mut self, period_ms: u64) -> Self {
        self.period = period_ms;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn to_spec(&self) -> EventSpec {
        EventSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
            period: self.period,
            parameter: self.parameter.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Configured period in milliseconds.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Takes effect on the next `init()`.
    pub fn set_period(&mut self, period_ms: u64) {
        self.period = period_ms;
    }

    /// Name of the parameter this event is meant to watch. Informational
    /// only: it is persisted but never read, and a Parameter event ticks its
    /// workflows on every engine tick whatever the parameter's value.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn set_parameter(&mut self, parameter: impl Into<String>) {
        self.parameter = parameter.into();
    }

    /// Effective loop step.
    pub fn step(&self) -> Duration {
        step_for(self.period)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Attach a workflow. Attaching the same workflow twice is a no-op.
    pub fn attach_workflow(&self, workflow: &Arc<Workflow>) {
        let mut list = self.workflows.write();
        list.retain(|w| w.strong_count() > 0);
        if !list.iter().any(|w| std::ptr::eq(w.as_ptr(), Arc::as_ptr(workflow))) {
            list.push(Arc::downgrade(workflow));
        }
    }

    pub fn detach_workflow(&self, workflow: &Arc<Workflow>) {
        self.workflows
            .write()
            .retain(|w| w.strong_count() > 0 && !std::ptr::eq(w.as_ptr(), Arc::as_ptr(workflow)));
    }

    pub fn detach_all(&self) {
        self.workflows.write().clear();
    }

    /// Names of the attached workflows still alive, in attachment order.
    pub fn workflow_names(&self) -> Vec<String> {
        self.workflows
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|w| w.name().to_string())
            .collect()
    }

    pub fn init(&mut self) {
        match self.kind {
            EventKind::Init => {
                tracing::debug!(event = %self.name, "init event firing");
                tick_all(&self.workflows);
            }
            EventKind::Cyclic | EventKind::Periodic => {
                self.stop();
                self.start();
            }
            EventKind::Exit | EventKind::Parameter => {}
        }
    }

    pub fn tick(&self) {
        match self.kind {
            EventKind::Init | EventKind::Exit => {}
            _ => tick_all(&self.workflows),
        }
    }

    pub fn exit(&mut self) {
        match self.kind {
            EventKind::Exit => {
                tracing::debug!(event = %self.name, "exit event firing");
                tick_all(&self.workflows);
            }
            EventKind::Cyclic | EventKind::Periodic => self.stop(),
            EventKind::Init | EventKind::Parameter => {}
        }
    }

    fn start(&mut self) {
        let step = self.step();
        let stop = Arc::new(StopSignal::default());
        let workflows = self.workflows.clone();
        let name = self.name.clone();
        let kind = self.kind;
        let signal = stop.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("tickflow-event-{}", self.name))
            .spawn(move || {
                tracing::info!(event = %name, kind = %kind, step_ms = step.as_millis() as u64, "event loop started");
                match kind {
                    EventKind::Periodic => run_periodic(&signal, &workflows, step),
                    _ => run_cyclic(&signal, &workflows, step),
                }
                tracing::info!(event = %name, "event loop stopped");
            });

        match spawned {
            Ok(handle) => self.running = Some(EventLoop { stop, handle }),
            Err(e) => {
                tracing::error!(event = %self.name, error = %e, "failed to start event loop");
            }
        }
    }

    /// Request the loop to stop and wait for it. An in-flight tick finishes
    /// first.
    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.stop();
            if running.handle.join().is_err() {
                tracing::error!(event = %self.name, "event loop panicked");
            }
        }
    }
}

fn run_cyclic(stop: &StopSignal, workflows: &WorkflowList, step: Duration) {
    while !stop.is_stopped() {
        tick_all(workflows);
        if stop.wait(step) {
            break;
        }
    }
}

fn run_periodic(stop: &StopSignal, workflows: &WorkflowList, step: Duration) {
    let mut next = next_boundary(wall_clock(), step);
    loop {
        let now = wall_clock();
        if stop.wait(next.saturating_sub(now)) {
            break;
        }
        next += step;
        tick_all(workflows);
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("period", &self.period)
            .field("parameter", &self.parameter)
            .field("running", &self.is_running())
            .finish()
    }
}
