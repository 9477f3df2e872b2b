//! Error types for the workflow engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while building or editing an engine.
///
/// Runtime failures never surface here; they are recorded on the task that
/// raised them.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Workflow not found.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// A workflow with the same name already exists.
    #[error("Duplicate workflow: {0}")]
    DuplicateWorkflow(String),

    /// A workflow needs a name.
    #[error("Workflow name is empty")]
    EmptyWorkflowName,

    /// The workflow is already ticking on this thread.
    #[error("Workflow '{0}' is already ticking on this thread")]
    ReentrantTick(String),

    /// Loading or saving the engine document failed.
    #[error(transparent)]
    Config(#[from] tickflow_config::ConfigError),
}

/// Failure reported by a task hook.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The argument string could not be parsed.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The workflow has no payload of the type the task needs.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// The task is not attached to a workflow.
    #[error("Task is not attached to a workflow")]
    Detached,

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("{0}")]
    Failed(String),
}
