//! CLI command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tickflow_config::EngineDocument;
use tickflow_engine::{TaskFactory, WorkflowServer};

pub mod check;
pub mod new;
pub mod run;
pub mod templates;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Factories registered on every server the CLI builds.
pub fn factories() -> Vec<Arc<dyn TaskFactory>> {
    vec![Arc::new(tickflow_tasks::default_factory())]
}

/// Load a document and build a server from it.
pub fn load_server(path: &Path) -> Result<WorkflowServer> {
    let document = EngineDocument::load(path)
        .with_context(|| format!("failed to load engine document {}", path.display()))?;
    let server = WorkflowServer::from_document(&document, factories())
        .with_context(|| format!("invalid engine document {}", path.display()))?;
    Ok(server)
}
