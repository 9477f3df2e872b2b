//! The named set of events owned by a server.

use tickflow_config::{EventKind, EventSpec};

use crate::event::Event;

pub const INIT_EVENT: &str = "InitEvent";
pub const EXIT_EVENT: &str = "ExitEvent";
pub const CYCLIC_EVENT: &str = "CyclicEvent";
pub const PERIODIC_EVENT: &str = "PeriodicEvent";

/// The events every engine starts with.
pub fn default_events() -> Vec<Event> {
    vec![
        Event::new(INIT_EVENT, EventKind::Init)
            .with_description("Ticks its workflows once when the engine starts."),
        Event::new(EXIT_EVENT, EventKind::Exit)
            .with_description("Ticks its workflows once when the engine stops."),
        Event::new(CYCLIC_EVENT, EventKind::Cyclic)
            .with_period(1000)
            .with_description("Ticks its workflows every period (ms)."),
        Event::new(PERIODIC_EVENT, EventKind::Periodic)
            .with_period(100)
            .with_description("Ticks its workflows on each wall-clock period boundary (ms)."),
    ]
}

fn is_lifecycle(name: &str) -> bool {
    name.eq_ignore_ascii_case(INIT_EVENT) || name.eq_ignore_ascii_case(EXIT_EVENT)
}

/// Events keyed by case-insensitive name, kept in insertion order.
///
/// `init`, `tick` and `exit` fan out to every event in that order. `init` and
/// `exit` are idempotent: a second call without the opposite one in between
/// does nothing.
#[derive(Debug)]
pub struct EventEngine {
    events: Vec<Event>,
    initialized: bool,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self {
            events: default_events(),
            initialized: false,
        }
    }
}

impl EventEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.name().eq_ignore_ascii_case(name))
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.index(name).map(|i| &self.events[i])
    }

    pub fn event_mut(&mut self, name: &str) -> Option<&mut Event> {
        self.index(name).map(|i| &mut self.events[i])
    }

    /// Add an event, replacing one with the same name in place.
    pub fn add_event(&mut self, event: Event) {
        match self.index(event.name()) {
            Some(i) => self.events[i] = event,
            None => self.events.push(event),
        }
    }

    /// Remove an event. The init and exit lifecycle events cannot be removed.
    pub fn delete_event(&mut self, name: &str) -> Option<Event> {
        if is_lifecycle(name) {
            tracing::warn!(event = %name, "lifecycle events cannot be deleted");
            return None;
        }
        self.index(name).map(|i| self.events.remove(i))
    }

    /// Drop every event and restore the defaults.
    pub fn clear(&mut self) {
        self.events = default_events();
        self.initialized = false;
    }

    /// Restore the defaults, then add `specs` over them.
    pub fn load_specs(&mut self, specs: &[EventSpec]) {
        self.clear();
        for spec in specs {
            self.add_event(Event::from_spec(spec));
        }
    }

    pub fn to_specs(&self) -> Vec<EventSpec> {
        self.events.iter().map(Event::to_spec).collect()
    }

    /// Sever every event from every workflow.
    pub fn detach_workflows(&self) {
        for event in &self.events {
            event.detach_all();
        }
    }

    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        for event in &mut self.events {
            event.init();
        }
        self.initialized = true;
        tracing::info!(events = self.events.len(), "event engine started");
    }

    pub fn tick(&self) {
        for event in &self.events {
            event.tick();
        }
    }

    pub fn exit(&mut self) {
        if !self.initialized {
            return;
        }
        for event in &mut self.events {
            event.exit();
        }
        self.initialized = false;
        tracing::info!("event engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let engine = EventEngine::new();
        let kinds: Vec<(&str, EventKind)> = engine
            .events()
            .iter()
            .map(|e| (e.name(), e.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (INIT_EVENT, EventKind::Init),
                (EXIT_EVENT, EventKind::Exit),
                (CYCLIC_EVENT, EventKind::Cyclic),
                (PERIODIC_EVENT, EventKind::Periodic),
            ]
        );
        assert_eq!(engine.event("cyclicevent").unwrap().period(), 1000);
        assert_eq!(engine.event("PERIODICEVENT").unwrap().period(), 100);
    }

    #[test]
    fn test_add_replaces_by_name() {
        let mut engine = EventEngine::new();
        engine.add_event(Event::new("cyclicevent", EventKind::Cyclic).with_period(250));
        assert_eq!(engine.events().len(), 4);
        assert_eq!(engine.events()[2].period(), 250);

        engine.add_event(Event::new("Extra", EventKind::Parameter));
        assert_eq!(engine.events().len(), 5);
    }

    #[test]
    fn test_lifecycle_events_cannot_be_deleted() {
        let mut engine = EventEngine::new();
        assert!(engine.delete_event("InitEvent").is_none());
        assert!(engine.delete_event("exitevent").is_none());
        assert!(engine.delete_event("CyclicEvent").is_some());
        assert_eq!(engine.events().len(), 3);

        engine.clear();
        assert_eq!(engine.events().len(), 4);
    }

    #[test]
    fn test_load_specs_keeps_defaults() {
        let mut engine = EventEngine::new();
        engine.load_specs(&[
            EventSpec::new("Fast", EventKind::Cyclic).with_period(50),
            EventSpec::new("InitEvent", EventKind::Init).with_description("Custom"),
        ]);
        assert_eq!(engine.events().len(), 5);
        assert_eq!(engine.event("InitEvent").unwrap().description(), "Custom");
        assert!(engine.event(EXIT_EVENT).is_some());
        assert_eq!(engine.event("fast").unwrap().period(), 50);
    }

    #[test]
    fn test_init_and_exit_are_idempotent() {
        let mut engine = EventEngine::new();
        engine.init();
        engine.init();
        assert!(engine.is_initialized());
        assert!(engine.event(CYCLIC_EVENT).unwrap().is_running());

        engine.exit();
        engine.exit();
        assert!(!engine.is_initialized());
        assert!(!engine.event(CYCLIC_EVENT).unwrap().is_running());
    }
}
