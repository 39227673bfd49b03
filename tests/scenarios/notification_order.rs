//! Test: side effects happen in order and infrastructure failures are absorbed

use crate::helpers::*;
use github_sentry::notify::NotificationStatus;
use github_sentry::persistence::ExecutionStore;
use github_sentry::pipeline::RelayError;

#[tokio::test]
async fn test_started_before_persistence_and_terminal_after_recording() {
    let timeline = Timeline::default();
    let harness = Harness::build(
        ScriptedExecutor::new().with_timeline(timeline.clone()),
        registry(&["build"], &["smoke"]),
        FlakyStore::new().with_timeline(timeline.clone()),
        RecordingNotifier::new().with_timeline(timeline.clone()),
        |relay| relay,
    );

    harness
        .run_to_completion(trigger("acme", "api", "Ordered"))
        .await;

    let started = timeline.position("notify:started").unwrap();
    let created = timeline.position("create_trigger:").unwrap();
    let first_execute = timeline.position("execute:").unwrap();
    let terminal = timeline.position("notify:success").unwrap();
    let last_record = timeline
        .entries()
        .iter()
        .rposition(|e| e.starts_with("record:"))
        .unwrap();

    assert!(started < created);
    assert!(created < first_execute);
    assert!(last_record < terminal);
    assert_eq!(timeline.entries().last().unwrap(), "notify:success");
}

#[tokio::test]
async fn test_trigger_record_failure_aborts_dispatch() {
    let harness = Harness::build(
        ScriptedExecutor::new(),
        registry(&["build"], &[]),
        FlakyStore::rejecting_triggers(),
        RecordingNotifier::new(),
        |relay| relay,
    );

    let result = harness.relay.accept(trigger("acme", "api", "Lost")).await;

    assert!(matches!(result, Err(RelayError::TriggerRecord(_))));
    assert!(harness.executor().invoked().is_empty());

    // only the started notification went out
    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, NotificationStatus::Started);
}

#[tokio::test]
async fn test_notification_failures_do_not_stop_the_run() {
    let harness = Harness::build(
        ScriptedExecutor::new(),
        registry(&["build"], &[]),
        FlakyStore::new(),
        RecordingNotifier::failing(),
        |relay| relay,
    );

    let trigger_id = harness
        .run_to_completion(trigger("acme", "api", "Quiet"))
        .await;

    assert_eq!(harness.executor().invoked(), vec!["build"]);
    assert_eq!(
        harness.store.executions_for(trigger_id).await.unwrap().len(),
        1
    );
    // one attempt each, no retries
    assert_eq!(harness.notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_failed_record_does_not_skip_the_rest() {
    let harness = Harness::build(
        ScriptedExecutor::new(),
        registry(&["build", "migrate", "deploy"], &[]),
        FlakyStore::new().rejecting_commands(&["migrate"]),
        RecordingNotifier::new(),
        |relay| relay,
    );

    let trigger_id = harness
        .run_to_completion(trigger("acme", "api", "Partial"))
        .await;

    let executions = harness.store.executions_for(trigger_id).await.unwrap();
    let names: Vec<_> = executions.iter().map(|e| e.script_name.as_str()).collect();
    assert_eq!(names, vec!["build", "deploy"]);

    let terminal = harness.notifier.sent().pop().unwrap();
    assert_eq!(terminal.status, NotificationStatus::Success);
}

#[tokio::test]
async fn test_exactly_one_terminal_notification_per_trigger() {
    let harness = Harness::new(
        ScriptedExecutor::new().failing(&["deploy"]),
        registry(&["build", "deploy"], &["smoke"]),
    );

    for message in ["one", "two", "three"] {
        harness
            .run_to_completion(trigger("acme", "api", message))
            .await;
    }

    let sent = harness.notifier.sent();
    let started = sent
        .iter()
        .filter(|n| n.status == NotificationStatus::Started)
        .count();
    let terminal = sent
        .iter()
        .filter(|n| n.status != NotificationStatus::Started)
        .count();

    assert_eq!(started, 3);
    assert_eq!(terminal, 3);
}
