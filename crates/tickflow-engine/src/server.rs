//! The workflow server: owner of parameters, events, workflows and factories.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tickflow_config::{ApplicationProperties, EngineDocument, EngineSection, TaskSpec, TaskType, WorkflowSpec};
use tickflow_parameter::ParameterContainer;

use crate::error::{EngineError, Result};
use crate::event_engine::EventEngine;
use crate::factory::{TaskFactory, TemplateList, template_list};
use crate::task::{InertTask, Task};
use crate::workflow::Workflow;

/// The part of a server that workflows reach back into.
pub(crate) struct ServerShared {
    workflows: RwLock<Vec<Arc<Workflow>>>,
    factories: RwLock<Vec<Arc<dyn TaskFactory>>>,
}

impl ServerShared {
    pub(crate) fn workflow(&self, name: &str) -> Option<Arc<Workflow>> {
        self.workflows
            .read()
            .iter()
            .find(|w| w.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// First factory claiming the template wins.
    fn resolve(&self, spec: &TaskSpec) -> Option<Box<dyn Task>> {
        if spec.task_type != TaskType::Internal {
            tracing::debug!(task = %spec.name, task_type = %spec.task_type, "task type is not executed");
            return None;
        }
        let factories = self.factories.read();
        let factory = factories.iter().find(|f| f.has_template(&spec.template))?;
        tracing::debug!(task = %spec.name, template = %spec.template, factory = %factory.name(), "template resolved");
        Some(factory.create_task(spec))
    }

    pub(crate) fn create_task(&self, spec: &TaskSpec) -> Box<dyn Task> {
        self.resolve(spec).unwrap_or_else(|| {
            if spec.task_type == TaskType::Internal && !spec.template.is_empty() {
                tracing::warn!(task = %spec.name, template = %spec.template, "no factory provides template, task is inert");
            }
            Box::new(InertTask::new(spec.clone()))
        })
    }
}

/// Aggregates everything a running engine needs.
///
/// Build one with [`WorkflowServer::new`], register the task factories, then
/// add workflows (or apply a document). `init` wires every workflow to its
/// start event and starts the event loops; `exit` stops them and severs the
/// wiring so a later `init` starts clean.
pub struct WorkflowServer {
    name: String,
    description: String,
    parameters: ParameterContainer,
    events: EventEngine,
    application: ApplicationProperties,
    shared: Arc<ServerShared>,
}

impl Default for WorkflowServer {
    fn default() -> Self {
        Self::new("")
    }
}

impl WorkflowServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters: ParameterContainer::default(),
            events: EventEngine::default(),
            application: ApplicationProperties::default(),
            shared: Arc::new(ServerShared {
                workflows: RwLock::new(Vec::new()),
                factories: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn parameters(&self) -> &ParameterContainer {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterContainer {
        &mut self.parameters
    }

    pub fn events(&self) -> &EventEngine {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventEngine {
        &mut self.events
    }

    pub fn application(&self) -> &ApplicationProperties {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut ApplicationProperties {
        &mut self.application
    }

    // ─────────────────────────────────────────────────────────────────────
    // Factories
    // ─────────────────────────────────────────────────────────────────────

    /// Register a factory. Existing inert tasks whose template it provides
    /// are rebuilt with it.
    pub fn register_factory(&self, factory: Arc<dyn TaskFactory>) {
        let replaced: usize = self
            .workflows()
            .iter()
            .map(|w| w.resolve_templates(factory.as_ref()))
            .sum();
        tracing::debug!(factory = %factory.name(), templates = factory.templates().len(), replaced, "factory registered");
        self.shared.factories.write().push(factory);
    }

    pub fn factories(&self) -> Vec<Arc<dyn TaskFactory>> {
        self.shared.factories.read().clone()
    }

    /// Every template on offer, in resolution order.
    pub fn templates(&self) -> TemplateList {
        template_list(&self.shared.factories.read())
    }

    /// Build a task from the first factory claiming its template.
    pub fn create_task(&self, spec: &TaskSpec) -> Option<Box<dyn Task>> {
        self.shared.resolve(spec)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Workflows
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot of the workflow list.
    pub fn workflows(&self) -> Vec<Arc<Workflow>> {
        self.shared.workflows.read().clone()
    }

    pub fn workflow(&self, name: &str) -> Option<Arc<Workflow>> {
        self.shared.workflow(name)
    }

    /// Build a workflow and its tasks from `spec`.
    pub fn add_workflow(&self, spec: &WorkflowSpec) -> Result<Arc<Workflow>> {
        if spec.name.is_empty() {
            return Err(EngineError::EmptyWorkflowName);
        }
        if self.workflow(&spec.name).is_some() {
            return Err(EngineError::DuplicateWorkflow(spec.name.clone()));
        }
        let workflow = Workflow::build(spec, Arc::downgrade(&self.shared));
        self.shared.workflows.write().push(workflow.clone());
        Ok(workflow)
    }

    /// Return the named workflow, creating an empty one when missing.
    pub fn create_workflow(&self, name: &str) -> Result<Arc<Workflow>> {
        match self.workflow(name) {
            Some(existing) => Ok(existing),
            None => self.add_workflow(&WorkflowSpec::new(name)),
        }
    }

    /// Remove a workflow and detach it from every event.
    pub fn delete_workflow(&self, name: &str) -> Result<Arc<Workflow>> {
        let removed = {
            let mut workflows = self.shared.workflows.write();
            let index = workflows
                .iter()
                .position(|w| w.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))?;
            workflows.remove(index)
        };
        for event in self.events.events() {
            event.detach_workflow(&removed);
        }
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Initialize every workflow and attach it to its start event, then
    /// start parameters and events.
    ///
    /// A workflow whose start event does not exist is left undriven.
    pub fn init(&mut self) {
        if self.events.is_initialized() {
            tracing::debug!(server = %self.name, "server already initialized");
            return;
        }
        tracing::info!(server = %self.name, "server starting");

        for workflow in self.workflows() {
            workflow.init();
            let start_event = workflow.start_event();
            match self.events.event(&start_event) {
                Some(event) => {
                    event.attach_workflow(&workflow);
                    tracing::debug!(workflow = %workflow.name(), event = %event.name(), "workflow attached");
                }
                None => {
                    tracing::warn!(workflow = %workflow.name(), start_event = %start_event, "start event not found, workflow is not driven");
                }
            }
        }

        self.parameters.init();
        self.events.init();
    }

    /// Tick parameters and every non-lifecycle event on the calling thread.
    pub fn tick(&self) {
        self.parameters.tick();
        self.events.tick();
    }

    /// Stop events, sever the event wiring, then exit every workflow.
    pub fn exit(&mut self) {
        self.parameters.exit();
        self.events.exit();
        self.events.detach_workflows();
        for workflow in self.workflows() {
            workflow.exit();
        }
        tracing::info!(server = %self.name, "server stopped");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────

    /// Build a server from a document. Factories are registered before any
    /// workflow is built.
    pub fn from_document(
        document: &EngineDocument,
        factories: impl IntoIterator<Item = Arc<dyn TaskFactory>>,
    ) -> Result<Self> {
        let mut server = Self::default();
        for factory in factories {
            server.register_factory(factory);
        }
        server.apply_document(document)?;
        Ok(server)
    }

    /// Replace this server's configuration with `document`.
    ///
    /// Events are reset to the defaults before the document's events are
    /// added, so the init and exit events always exist afterwards. Must not
    /// be called while the server is running.
    pub fn apply_document(&mut self, document: &EngineDocument) -> Result<()> {
        let engine = &document.engine;
        self.name = engine.name.clone();
        self.description = engine.description.clone();
        self.parameters = engine.parameters.clone();
        self.events.load_specs(&engine.events);
        self.application = document.application.clone();

        self.shared.workflows.write().clear();
        for spec in &engine.workflows {
            self.add_workflow(spec)?;
        }
        tracing::debug!(server = %self.name, workflows = engine.workflows.len(), events = self.events.events().len(), "document applied");
        Ok(())
    }

    pub fn to_document(&self) -> EngineDocument {
        EngineDocument {
            engine: EngineSection {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: self.parameters.clone(),
                events: self.events.to_specs(),
                workflows: self.workflows().iter().map(|w| w.to_spec()).collect(),
            },
            application: self.application.clone(),
        }
    }

    /// Load and apply a document file.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let document = EngineDocument::load(path)?;
        self.apply_document(&document)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_document().save(path)?;
        Ok(())
    }
}

impl Drop for WorkflowServer {
    fn drop(&mut self) {
        if self.events.is_initialized() {
            self.exit();
        }
    }
}

impl std::fmt::Debug for WorkflowServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowServer")
            .field("name", &self.name)
            .field("events", &self.events)
            .field("workflows", &self.workflows())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_names_are_unique() {
        let server = WorkflowServer::new("Test");
        server.add_workflow(&WorkflowSpec::new("Flow")).unwrap();
        assert!(matches!(
            server.add_workflow(&WorkflowSpec::new("flow")),
            Err(EngineError::DuplicateWorkflow(_))
        ));
        assert!(matches!(
            server.add_workflow(&WorkflowSpec::new("")),
            Err(EngineError::EmptyWorkflowName)
        ));
        let again = server.create_workflow("FLOW").unwrap();
        assert_eq!(again.name(), "Flow");
        assert_eq!(server.workflows().len(), 1);
    }

    #[test]
    fn test_delete_workflow() {
        let server = WorkflowServer::new("Test");
        server.add_workflow(&WorkflowSpec::new("Flow")).unwrap();
        assert!(server.delete_workflow("flow").is_ok());
        assert!(matches!(
            server.delete_workflow("flow"),
            Err(EngineError::WorkflowNotFound(_))
        ));
    }

    #[test]
    fn test_sibling_lookup_through_server() {
        let server = WorkflowServer::new("Test");
        let a = server.add_workflow(&WorkflowSpec::new("A")).unwrap();
        server.add_workflow(&WorkflowSpec::new("B")).unwrap();
        assert_eq!(a.get_workflow("b").unwrap().name(), "B");
        assert!(a.get_workflow("C").is_none());
    }

    #[test]
    fn test_create_task_without_factories() {
        let server = WorkflowServer::new("Test");
        assert!(server.create_task(&TaskSpec::new("A", "Anything")).is_none());
        assert!(server.templates().is_empty());
    }
}
