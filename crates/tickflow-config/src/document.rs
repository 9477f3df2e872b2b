//! Engine document types.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tickflow_parameter::ParameterContainer;

use crate::error::{ConfigError, Result};
use crate::properties::ApplicationProperties;

/// Serialize as the label, deserialize leniently through `FromStr`, falling
/// back to `Default` with a warning.
macro_rules! label_serde {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                Ok(label.parse().unwrap_or_else(|_| {
                    let fallback = <$ty>::default();
                    tracing::warn!(kind = $what, label = %label, fallback = %fallback, "unknown type label");
                    fallback
                }))
            }
        }
    };
}

/// What triggers an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventKind {
    /// Ticks its workflows once when the engine starts.
    Init,
    /// Ticks its workflows once when the engine stops.
    Exit,
    /// Background loop sleeping a fixed step between ticks.
    Cyclic,
    /// Background loop aligned to wall-clock multiples of the step.
    Periodic,
    /// Signal driven. Ticks with the engine.
    #[default]
    Parameter,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Init,
        EventKind::Exit,
        EventKind::Cyclic,
        EventKind::Periodic,
        EventKind::Parameter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Init => "Init",
            EventKind::Exit => "Exit",
            EventKind::Cyclic => "Cyclic",
            EventKind::Periodic => "Periodic",
            EventKind::Parameter => "Parameter",
        }
    }

    /// Whether events of this kind own a background loop while running.
    pub fn is_threaded(self) -> bool {
        matches!(self, EventKind::Cyclic | EventKind::Periodic)
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .find(|k| k.label().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("unknown event type '{wanted}'"))
    }
}

label_serde!(EventKind, "event");

/// How a task is implemented. Only `Internal` tasks are executed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskType {
    #[default]
    Internal,
    Dll,
    Executable,
    Lua,
    Python,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::Internal,
        TaskType::Dll,
        TaskType::Executable,
        TaskType::Lua,
        TaskType::Python,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskType::Internal => "Internal",
            TaskType::Dll => "DLL",
            TaskType::Executable => "Executable",
            TaskType::Lua => "Lua",
            TaskType::Python => "Python",
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Some(found) = Self::ALL
            .iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
        {
            return Ok(*found);
        }
        match wanted.to_ascii_lowercase().as_str() {
            "exe" => Ok(TaskType::Executable),
            _ => Err(format!("unknown task type '{wanted}'")),
        }
    }
}

label_serde!(TaskType, "task");

/// Persisted form of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Loop step in milliseconds. Only used by cyclic and periodic events.
    pub period: u64,
    /// Name of the boolean parameter driving a parameter event.
    pub parameter: String,
}

impl Default for EventSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            kind: EventKind::default(),
            period: 1000,
            parameter: String::new(),
        }
    }
}

impl EventSpec {
    pub fn new(name: impl Into<String>, kind: EventKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
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

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }
}

/// Persisted form of a task. Also the configuration a task instance carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub documentation: String,
    /// Flag-style argument string interpreted by the concrete task.
    pub arguments: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Template name used to resolve the concrete task.
    pub template: String,
    /// Informational, in seconds.
    pub period: f64,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }
}

/// Persisted form of a workflow and its ordered task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSpec {
    pub name: String,
    pub description: String,
    pub start_event: String,
    pub tasks: Vec<TaskSpec>,
}

impl WorkflowSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_start_event(mut self, event: impl Into<String>) -> Self {
        self.start_event = event.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }
}

/// The `[engine]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub name: String,
    pub description: String,
    pub parameters: ParameterContainer,
    pub events: Vec<EventSpec>,
    pub workflows: Vec<WorkflowSpec>,
}

/// A complete persisted engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDocument {
    pub engine: EngineSection,
    #[serde(skip_serializing_if = "ApplicationProperties::is_empty")]
    pub application: ApplicationProperties,
}

impl EngineDocument {
    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a document from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Save the document, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }
}
