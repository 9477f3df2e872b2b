//! Persisted configuration for tickflow engines.
//!
//! An [`EngineDocument`] describes one workflow server: its parameters, its
//! events and its workflows with their task lists, plus a free-form
//! [`ApplicationProperties`] bag for the hosting application. Documents are
//! stored as TOML and read tolerantly: every field has a default and unknown
//! type labels fall back to a default instead of failing the load.

pub mod document;
pub mod error;
pub mod properties;

pub use document::{EngineDocument, EngineSection, EventKind, EventSpec, TaskSpec, TaskType, WorkflowSpec};
pub use error::{ConfigError, Result};
pub use properties::ApplicationProperties;
