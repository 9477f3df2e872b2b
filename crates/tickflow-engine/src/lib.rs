//! Event-driven workflow engine.
//!
//! A [`WorkflowServer`] owns a [`ParameterContainer`](tickflow_parameter::ParameterContainer),
//! an [`EventEngine`], a list of [`Workflow`]s and the registered
//! [`TaskFactory`]s that turn task configurations into concrete [`Task`]s.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  WorkflowServer                                              │
//! │  - EventEngine: Init / Exit / Cyclic / Periodic / Parameter  │
//! │      └─ each Cyclic/Periodic event owns one loop thread      │
//! │  - Workflows: ordered tasks + one typed data slot            │
//! │  - Factories: template name -> concrete task                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events tick the workflows attached to them; a workflow ticks its tasks in
//! order; a task may hand data to a sibling workflow through the server.
//! Task failures never propagate: they are recorded on the task.

pub mod error;
pub mod event;
pub mod event_engine;
pub mod factory;
pub mod server;
pub mod task;
pub mod workflow;

pub use error::{EngineError, Result, TaskError};
pub use event::{DEFAULT_STEP, Event, MIN_PERIOD, next_boundary, step_for};
pub use event_engine::{CYCLIC_EVENT, EXIT_EVENT, EventEngine, INIT_EVENT, PERIODIC_EVENT, default_events};
pub use factory::{TaskConstructor, TaskFactory, TemplateEntry, TemplateFactory, TemplateList, template_list};
pub use server::WorkflowServer;
pub use task::{InertTask, Task, TaskCore, TaskStatus, downcast_task};
pub use workflow::Workflow;

pub use tickflow_config::{EventKind, EventSpec, TaskSpec, TaskType, WorkflowSpec};
