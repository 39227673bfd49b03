//! Test: draining the relay lets in-flight runs finish

use crate::helpers::*;
use github_sentry::notify::NotificationStatus;
use github_sentry::persistence::ExecutionStore;
use std::time::Duration;

#[tokio::test]
async fn test_drain_waits_for_in_flight_runs() {
    let harness = Harness::new(
        ScriptedExecutor::new().delay("deploy", Duration::from_millis(200)),
        registry(&["build", "deploy"], &["smoke"]),
    );

    let handle = harness
        .relay
        .accept(trigger("acme", "api", "Release"))
        .await
        .unwrap();
    let trigger_id = handle.trigger_id;
    drop(handle);

    harness.relay.drain().await;

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].status, NotificationStatus::Success);

    let executions = harness.store.executions_for(trigger_id).await.unwrap();
    assert_eq!(executions.len(), 3);
}

#[tokio::test]
async fn test_drain_covers_every_dispatched_run() {
    let harness = Harness::new(
        ScriptedExecutor::new().delay("build", Duration::from_millis(100)),
        registry(&["build"], &[]),
    );

    for message in ["first", "second", "third"] {
        harness
            .relay
            .accept(trigger("acme", "api", message))
            .await
            .unwrap();
    }

    harness.relay.drain().await;

    let terminal = harness
        .notifier
        .sent()
        .into_iter()
        .filter(|n| n.status == NotificationStatus::Success)
        .count();
    assert_eq!(terminal, 3);
}

#[tokio::test]
async fn test_relay_accepts_after_drain() {
    let harness = Harness::new(ScriptedExecutor::new(), registry(&["build"], &[]));

    harness.relay.drain().await;
    harness
        .run_to_completion(trigger("acme", "api", "After drain"))
        .await;
    harness.relay.drain().await;

    assert_eq!(harness.executor().invoked(), vec!["build"]);
}
