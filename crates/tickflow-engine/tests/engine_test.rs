//! Integration tests for WorkflowServer wiring and workflow execution.

mod common;

use std::sync::Arc;

use common::{Failing, Primed, Recorder, test_factory, tick_log};
use tickflow_config::EngineDocument;
use tickflow_engine::{
    EXIT_EVENT, EventKind, EventSpec, INIT_EVENT, InertTask, TaskFactory, TaskSpec,
    TemplateFactory, Workflow, WorkflowServer, WorkflowSpec, downcast_task,
};

fn server_with_factory() -> WorkflowServer {
    let server = WorkflowServer::new("Test");
    server.register_factory(Arc::new(test_factory()));
    server
}

#[test]
fn test_tasks_tick_in_order_after_a_failure() {
    let workflow = Workflow::standalone("Flow");
    workflow.push_task(Recorder::boxed(&TaskSpec::new("A", "Record")));
    workflow.push_task(Failing::boxed(&TaskSpec::new("B", "Fail")));
    workflow.push_task(Recorder::boxed(&TaskSpec::new("C", "Record")));
    workflow.init();

    workflow.tick();
    workflow.tick();

    assert_eq!(tick_log(&workflow), ["A", "B", "C", "A", "B", "C"]);
    let status = workflow.task_status();
    assert!(status[0].is_ok);
    assert!(!status[1].is_ok);
    assert_eq!(status[1].last_error, "always fails");
    assert!(status[2].is_ok);
}

#[test]
fn test_first_registered_factory_wins() {
    let server = server_with_factory();
    let shadow = TemplateFactory::new("Shadow", "").with_template(TaskSpec::new("", "Record"), Failing::boxed);
    server.register_factory(Arc::new(shadow));

    let task = server.create_task(&TaskSpec::new("A", "record")).unwrap();
    assert!(downcast_task::<Recorder>(task.as_ref()).is_some());

    assert!(server.create_task(&TaskSpec::new("A", "Unknown")).is_none());
    assert_eq!(server.templates().len(), 7);
}

#[test]
fn test_unknown_template_becomes_inert_task() {
    let server = server_with_factory();
    let workflow = server
        .add_workflow(&WorkflowSpec::new("Flow").with_task(TaskSpec::new("A", "Unknown")))
        .unwrap();
    let task = workflow.task("A").unwrap();
    assert!(downcast_task::<InertTask>(&*task).is_some());
}

#[test]
fn test_late_factory_resolves_inert_tasks() {
    let server = WorkflowServer::new("Test");
    let workflow = server
        .add_workflow(&WorkflowSpec::new("Flow").with_task(TaskSpec::new("A", "Record")))
        .unwrap();
    assert!(downcast_task::<InertTask>(&*workflow.task("A").unwrap()).is_some());

    server.register_factory(Arc::new(test_factory()));
    assert!(downcast_task::<Recorder>(&*workflow.task("A").unwrap()).is_some());
}

#[test]
fn test_factory_registered_after_init_initializes_its_tasks() {
    let mut server = WorkflowServer::new("Test");
    let workflow = server
        .add_workflow(
            &WorkflowSpec::new("Flow")
                .with_start_event("Nowhere")
                .with_task(TaskSpec::new("A", "Prime")),
        )
        .unwrap();
    server.init();

    server.register_factory(Arc::new(test_factory()));
    {
        let task = workflow.task("A").unwrap();
        assert!(downcast_task::<Primed>(&*task).is_some());
        assert!(task.workflow().is_some());
    }

    workflow.tick();
    server.exit();
    assert_eq!(tick_log(&workflow), ["A"]);
    assert!(workflow.task_status()[0].is_ok);
}

#[test]
fn test_factory_registered_before_init_leaves_tasks_detached() {
    let server = WorkflowServer::new("Test");
    let workflow = server
        .add_workflow(&WorkflowSpec::new("Flow").with_task(TaskSpec::new("A", "Prime")))
        .unwrap();
    server.register_factory(Arc::new(test_factory()));
    assert!(workflow.task("A").unwrap().workflow().is_none());
}

#[test]
fn test_forwarding_cycle_fails_instead_of_hanging() {
    let server = server_with_factory();
    let first = server
        .add_workflow(
            &WorkflowSpec::new("First")
                .with_task(TaskSpec::new("ToSecond", "Relay").with_description("Second")),
        )
        .unwrap();
    let second = server
        .add_workflow(
            &WorkflowSpec::new("Second")
                .with_task(TaskSpec::new("ToFirst", "Relay").with_description("First")),
        )
        .unwrap();
    first.init();
    second.init();

    let (done, finished) = std::sync::mpsc::channel();
    let ticking = first.clone();
    std::thread::spawn(move || {
        ticking.tick();
        let _ = done.send(());
    });
    finished
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("forwarding cycle hung the ticking thread");

    assert!(first.task_status()[0].is_ok);
    let status = second.task_status();
    assert!(!status[0].is_ok);
    assert!(status[0].last_error.contains("already ticking"));
}

#[test]
fn test_cross_workflow_handoff() {
    let server = server_with_factory();
    let sender = server
        .add_workflow(
            &WorkflowSpec::new("Sender").with_task(
                TaskSpec::new("Send", "Forward")
                    .with_description("Receiver")
                    .with_arguments("P"),
            ),
        )
        .unwrap();
    let receiver = server.add_workflow(&WorkflowSpec::new("Receiver")).unwrap();

    sender.init();
    sender.tick();
    assert_eq!(receiver.data::<String>().as_deref().map(String::as_str), Some("P"));

    receiver.clear_data();
    assert!(receiver.data::<String>().is_none());
}

#[test]
fn test_missing_sibling_fails_the_task() {
    let server = server_with_factory();
    let sender = server
        .add_workflow(
            &WorkflowSpec::new("Sender")
                .with_task(TaskSpec::new("Send", "Forward").with_description("Nowhere")),
        )
        .unwrap();
    sender.init();
    sender.tick();
    let status = sender.task_status();
    assert!(!status[0].is_ok);
    assert!(status[0].last_error.contains("Nowhere"));
}

#[test]
fn test_init_and_exit_events_drive_their_workflows() {
    let mut server = server_with_factory();
    let starter = server
        .add_workflow(
            &WorkflowSpec::new("Starter")
                .with_start_event(INIT_EVENT)
                .with_task(TaskSpec::new("Start", "Record")),
        )
        .unwrap();
    let stopper = server
        .add_workflow(
            &WorkflowSpec::new("Stopper")
                .with_start_event(EXIT_EVENT)
                .with_task(TaskSpec::new("Stop", "Record")),
        )
        .unwrap();

    server.init();
    assert_eq!(tick_log(&starter), ["Start"]);
    assert!(tick_log(&stopper).is_empty());

    // Engine ticks never fire lifecycle events.
    server.tick();
    assert_eq!(tick_log(&starter), ["Start"]);

    server.exit();
    assert_eq!(tick_log(&stopper), ["Stop"]);
    assert_eq!(tick_log(&starter), ["Start"]);
}

#[test]
fn test_parameter_event_ticks_with_the_server() {
    let mut server = server_with_factory();
    server
        .events_mut()
        .add_event(tickflow_engine::Event::from_spec(&EventSpec::new("Signal", EventKind::Parameter)));
    // The watched parameter does not exist; the event ticks regardless.
    server
        .events_mut()
        .event_mut("Signal")
        .unwrap()
        .set_parameter("Missing");
    let workflow = server
        .add_workflow(
            &WorkflowSpec::new("Flow")
                .with_start_event("signal")
                .with_task(TaskSpec::new("A", "Record")),
        )
        .unwrap();

    server.init();
    server.tick();
    server.tick();
    server.exit();
    assert_eq!(tick_log(&workflow), ["A", "A"]);
}

#[test]
fn test_unknown_start_event_leaves_workflow_undriven() {
    let mut server = server_with_factory();
    let workflow = server
        .add_workflow(
            &WorkflowSpec::new("Flow")
                .with_start_event("Nonexistent")
                .with_task(TaskSpec::new("A", "Record")),
        )
        .unwrap();

    server.init();
    server.tick();
    assert!(server.events().events().iter().all(|e| e.workflow_names().is_empty()));
    server.exit();
    assert!(tick_log(&workflow).is_empty());
}

#[test]
fn test_exit_severs_attachments() {
    let mut server = server_with_factory();
    server
        .add_workflow(&WorkflowSpec::new("Flow").with_start_event(INIT_EVENT))
        .unwrap();

    server.init();
    assert_eq!(server.events().event(INIT_EVENT).unwrap().workflow_names(), ["Flow"]);
    server.exit();
    assert!(server.events().event(INIT_EVENT).unwrap().workflow_names().is_empty());

    // A second run attaches once, not twice.
    server.init();
    assert_eq!(server.events().event(INIT_EVENT).unwrap().workflow_names(), ["Flow"]);
    server.exit();
}

#[test]
fn test_tasks_are_detached_after_exit() {
    let mut server = server_with_factory();
    let workflow = server
        .add_workflow(&WorkflowSpec::new("Flow").with_task(TaskSpec::new("A", "Record")))
        .unwrap();
    server.init();
    assert!(workflow.task("A").unwrap().workflow().is_some());
    server.exit();
    assert!(workflow.task("A").unwrap().workflow().is_none());
}

#[test]
fn test_loaded_document_always_has_lifecycle_events() {
    let document = EngineDocument::from_toml(
        r#"
        [engine]
        name = "Minimal"

        [[engine.events]]
        name = "Fast"
        type = "Cyclic"
        period = 50
        "#,
    )
    .unwrap();
    let factories: Vec<Arc<dyn TaskFactory>> = vec![Arc::new(test_factory())];
    let server = WorkflowServer::from_document(&document, factories).unwrap();

    let events = server.events();
    assert_eq!(events.event(INIT_EVENT).unwrap().kind(), EventKind::Init);
    assert_eq!(events.event(EXIT_EVENT).unwrap().kind(), EventKind::Exit);
    assert_eq!(events.event("fast").unwrap().period(), 50);
    assert_eq!(events.events().len(), 5);
}

#[test]
fn test_document_round_trip_through_server() {
    let mut server = server_with_factory();
    server.set_description("Round trip");
    server.application_mut().set("Window/Width", 800);
    server
        .parameters_mut()
        .create_parameter("Car", "Speed")
        .unwrap();
    server
        .events_mut()
        .add_event(tickflow_engine::Event::new("Fast", EventKind::Cyclic).with_period(250));
    server
        .add_workflow(
            &WorkflowSpec::new("Flow")
                .with_start_event("Fast")
                .with_task(TaskSpec::new("A", "Record").with_arguments("--x=1"))
                .with_task(TaskSpec::new("B", "Unknown")),
        )
        .unwrap();

    let document = server.to_document();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    server.save(&path).unwrap();

    let mut loaded = server_with_factory();
    loaded.load(&path).unwrap();
    assert_eq!(loaded.to_document(), document);

    let flow = loaded.workflow("flow").unwrap();
    assert!(downcast_task::<Recorder>(&*flow.task("A").unwrap()).is_some());
    assert_eq!(loaded.parameters().parameters().len(), 1);
}
