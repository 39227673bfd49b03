//! Test: a failing sequential command stops the run and produces a failure card

use crate::helpers::*;
use github_sentry::core::RunPhase;
use github_sentry::execution::{CommandEngine, ShellExecutor};
use github_sentry::notify::{NotificationStatus, Notifier};
use github_sentry::persistence::ExecutionStore;
use github_sentry::pipeline::Relay;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_shell_failure_reaches_the_notification() {
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(FlakyStore::new());
    let phases = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&phases);

    let relay = Arc::new(
        Relay::new(
            CommandEngine::new(ShellExecutor::new()),
            registry(&["echo build", "exit 1"], &[]),
            Arc::clone(&store) as Arc<dyn ExecutionStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        )
        .with_event_handler(move |event| seen.lock().unwrap().push(event.phase)),
    );

    let handle = relay.accept(trigger("acme", "api", "Fix login")).await.unwrap();
    handle.task.await.unwrap();

    // Both results recorded, the second as a failure
    let executions = store.executions_for(handle.trigger_id).await.unwrap();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].script_name, "echo build");
    assert_eq!(executions[0].status, "success");
    assert_eq!(executions[0].output.trim(), "build");
    assert_eq!(executions[1].script_name, "exit 1");
    assert_eq!(executions[1].status, "failed");
    assert_eq!(executions[1].error, "exit status 1");

    assert!(phases.lock().unwrap().contains(&RunPhase::SequentialFailed));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].status, NotificationStatus::Failure);
    assert!(sent[1].message.starts_with("Fix login (FAILED)"));
    assert!(sent[1].message.contains("Script: exit 1"));
    assert!(sent[1].message.contains("Error: exit status 1"));
}

#[tokio::test]
async fn test_later_commands_never_run() {
    let executor = ScriptedExecutor::new().failing(&["test"]);
    let harness = Harness::new(
        executor,
        registry(&["build", "test", "deploy"], &["smoke", "docs"]),
    );

    let trigger_id = harness
        .run_to_completion(trigger("acme", "api", "Add search"))
        .await;

    assert_eq!(harness.executor().invoked(), vec!["build", "test"]);

    let executions = harness.store.executions_for(trigger_id).await.unwrap();
    let names: Vec<_> = executions.iter().map(|e| e.script_name.as_str()).collect();
    assert_eq!(names, vec!["build", "test"]);

    let terminal = harness.notifier.sent().pop().unwrap();
    assert_eq!(terminal.status, NotificationStatus::Failure);
    assert!(terminal.message.contains("Script: test"));
}

#[tokio::test]
async fn test_failure_output_is_truncated() {
    let notifier = Arc::new(RecordingNotifier::new());
    let relay = Arc::new(Relay::new(
        CommandEngine::new(ShellExecutor::new()),
        registry(&["printf 'x%.0s' $(seq 1 3000); exit 3"], &[]),
        Arc::new(FlakyStore::new()) as Arc<dyn ExecutionStore>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    ));

    let handle = relay.accept(trigger("acme", "api", "Noisy")).await.unwrap();
    handle.task.await.unwrap();

    let terminal = notifier.sent().pop().unwrap();
    let output = terminal.message.split("Output:\n").nth(1).unwrap();

    assert_eq!(output, format!("{}...(truncated)", "x".repeat(2000)));
    assert!(terminal.message.contains("Error: exit status 3"));
}
