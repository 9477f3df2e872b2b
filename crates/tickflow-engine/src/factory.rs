//! Task-template factories.
//!
//! A factory owns a catalogue of named prototype tasks and builds new task
//! instances from a [`TaskSpec`] by matching its `template` field against
//! that catalogue. Hosts register factories on a
//! [`WorkflowServer`](crate::WorkflowServer); resolution tries them in
//! registration order.

use std::sync::Arc;

use tickflow_config::TaskSpec;

use crate::task::{InertTask, Task};

/// Builds a concrete task from its configuration.
pub type TaskConstructor = fn(&TaskSpec) -> Box<dyn Task>;

/// Provider of named task prototypes.
pub trait TaskFactory: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Prototype tasks in catalogue order.
    fn templates(&self) -> Vec<&dyn Task>;

    /// Read access to the prototype registered under `name`.
    fn template(&self, name: &str) -> Option<&dyn Task> {
        self.templates()
            .into_iter()
            .find(|t| t.template().eq_ignore_ascii_case(name))
    }

    fn has_template(&self, name: &str) -> bool {
        self.template(name).is_some()
    }

    /// Build a task for `source`. Templates this factory does not know
    /// produce an [`InertTask`].
    fn create_task(&self, source: &TaskSpec) -> Box<dyn Task>;
}

struct Template {
    prototype: Box<dyn Task>,
    construct: TaskConstructor,
}

/// A factory backed by a registered-constructor table.
pub struct TemplateFactory {
    name: String,
    description: String,
    templates: Vec<Template>,
}

impl TemplateFactory {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            templates: Vec::new(),
        }
    }

    /// Register a template. `prototype.template` is the name it is looked up
    /// by; a prototype with an empty task name takes the template name.
    pub fn register(&mut self, mut prototype: TaskSpec, construct: TaskConstructor) {
        if prototype.name.is_empty() {
            prototype.name = prototype.template.clone();
        }
        if self.has_template(&prototype.template) {
            tracing::warn!(factory = %self.name, template = %prototype.template, "template already registered, replacing");
            self.templates
                .retain(|t| !t.prototype.template().eq_ignore_ascii_case(&prototype.template));
        }
        self.templates.push(Template {
            prototype: construct(&prototype),
            construct,
        });
    }

    pub fn with_template(mut self, prototype: TaskSpec, construct: TaskConstructor) -> Self {
        self.register(prototype, construct);
        self
    }
}

impl std::fmt::Debug for TemplateFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateFactory")
            .field("name", &self.name)
            .field(
                "templates",
                &self
                    .templates
                    .iter()
                    .map(|t| t.prototype.template())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TaskFactory for TemplateFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn templates(&self) -> Vec<&dyn Task> {
        self.templates.iter().map(|t| t.prototype.as_ref()).collect()
    }

    fn create_task(&self, source: &TaskSpec) -> Box<dyn Task> {
        let found = self
            .templates
            .iter()
            .find(|t| t.prototype.template().eq_ignore_ascii_case(&source.template));
        match found {
            Some(template) => {
                let mut spec = source.clone();
                let prototype = template.prototype.spec();
                if spec.description.is_empty() {
                    spec.description = prototype.description.clone();
                }
                if spec.documentation.is_empty() {
                    spec.documentation = prototype.documentation.clone();
                }
                (template.construct)(&spec)
            }
            None => Box::new(InertTask::new(source.clone())),
        }
    }
}

/// One line of a template listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub factory: String,
    pub template: String,
    pub description: String,
}

/// All templates offered by a set of factories, in resolution order.
pub type TemplateList = Vec<TemplateEntry>;

pub fn template_list(factories: &[Arc<dyn TaskFactory>]) -> TemplateList {
    factories
        .iter()
        .flat_map(|factory| {
            factory.templates().into_iter().map(move |t| TemplateEntry {
                factory: factory.name().to_string(),
                template: t.template().to_string(),
                description: t.spec().description.clone(),
            })
        })
        .collect()
}
