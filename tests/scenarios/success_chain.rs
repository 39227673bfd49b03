//! Test: a fully passing run walks every phase and reports success

use crate::helpers::*;
use github_sentry::core::RunPhase;
use github_sentry::notify::NotificationStatus;
use github_sentry::persistence::ExecutionStore;

#[tokio::test]
async fn test_success_chain() {
    let harness = Harness::new(
        ScriptedExecutor::new(),
        registry(&["build", "test", "deploy"], &["smoke"]),
    );

    let trigger_id = harness
        .run_to_completion(trigger("acme", "api", "Release 1.2"))
        .await;

    assert_eq!(
        harness.phases(),
        vec![
            RunPhase::Accepted,
            RunPhase::StartedNotified,
            RunPhase::Dispatched,
            RunPhase::Executing,
            RunPhase::Succeeded,
            RunPhase::Recorded,
            RunPhase::Notified,
            RunPhase::Done,
        ]
    );

    let executions = harness.store.executions_for(trigger_id).await.unwrap();
    assert_eq!(executions.len(), 4);
    assert!(executions.iter().all(|e| e.status == "success"));
    assert_eq!(executions[0].output, "ran build");

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].status, NotificationStatus::Started);
    assert_eq!(sent[0].message, "Release 1.2");
    assert_eq!(sent[1].status, NotificationStatus::Success);
    assert_eq!(sent[1].message, "Release 1.2");
    assert_eq!(sent[1].author, "Dana");
    assert_eq!(sent[1].branch, "staging");
}

#[tokio::test]
async fn test_trigger_is_recorded_with_commit_details() {
    let harness = Harness::new(ScriptedExecutor::new(), registry(&["build"], &[]));

    let commit = trigger("acme", "api", "Fix login");
    let trigger_id = harness.run_to_completion(commit.clone()).await;

    let recorded = harness.store.recent_triggers(1).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].id, trigger_id);
    assert_eq!(recorded[0].commit_id, commit.commit_id);
    assert_eq!(recorded[0].commit_message, "Fix login");
    assert_eq!(recorded[0].branch, "staging");
    assert_eq!(recorded[0].time, commit.commit_time);
}

#[tokio::test]
async fn test_every_event_belongs_to_one_run() {
    let harness = Harness::new(ScriptedExecutor::new(), registry(&["build"], &[]));

    let handle = harness
        .relay
        .accept(trigger("acme", "api", "Tracked"))
        .await
        .unwrap();
    handle.task.await.unwrap();

    let events = harness.events.lock().unwrap().clone();
    assert!(events.iter().all(|e| e.run_id == handle.run_id));
    assert!(events.iter().all(|e| e.commit_id == "a1b2c3d"));
    assert!(events.last().unwrap().phase.is_terminal());
}
