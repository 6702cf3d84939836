//! Reconciler integration tests
//!
//! Drives policy-scoped and secret-scoped passes against the in-memory store.

mod common;

use common::{harness, opaque_in, policy, secret, with_annotation, Op};
use secret_policy_controller::constants::{
    EVENT_REASON_VIOLATION, LAST_ROTATED_ANNOTATION, POLICY_FINALIZER, READY_CONDITION,
    REASON_COMPLIANT, REASON_VIOLATIONS_FOUND,
};
use secret_policy_controller::controller::events::EventSeverity;
use secret_policy_controller::controller::reconciler::{has_finalizer, Trigger};
use chrono::DateTime;
use secret_policy_controller::crd::{ConditionStatus, SecretPolicyStatus};
use std::time::Duration;

#[tokio::test]
async fn test_policy_pass_records_violations_in_status_and_events() {
    let (reconciler, store, events) = harness();
    let mut spec = opaque_in(&["prod"]);
    spec.disallowed_keys = vec!["password".to_string()];
    store.insert_policy(policy("security", "strict", spec));
    store.insert_secret(secret("prod", "api", &[("token", "abc")]));
    store.insert_secret(secret("dev", "db", &[("password", "hunter2")]));

    let requeue = reconciler
        .reconcile(&Trigger::policy("security", "strict"))
        .await
        .unwrap();
    assert_eq!(requeue, None);

    let stored = store.policy("security", "strict").unwrap();
    assert!(has_finalizer(&stored));
    let status = stored.status.unwrap();
    assert_eq!(status.enforced_secrets, 2);
    assert_eq!(status.violations, 2);
    assert_eq!(status.secret_violations.len(), 1);
    assert_eq!(status.secret_violations[0].namespace, "dev");
    assert_eq!(status.secret_violations[0].name, "db");
    assert_eq!(
        status.secret_violations[0].violations,
        vec!["key password is disallowed", "namespace dev is not allowed"]
    );
    assert_eq!(status.observed_generation, Some(1));
    assert!(status.last_scan_time.is_some());

    let ready = status.conditions.get(READY_CONDITION).unwrap();
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason, REASON_VIOLATIONS_FOUND);
    assert_eq!(ready.message, "2 violations found in 1 secrets");

    let recorded = events.events();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|e| e.severity == EventSeverity::Warning
        && e.reason == EVENT_REASON_VIOLATION
        && e.policy == "security/strict"));
    assert_eq!(
        events.messages(),
        vec![
            "Secret dev/db: key password is disallowed",
            "Secret dev/db: namespace dev is not allowed",
        ]
    );
}

#[tokio::test]
async fn test_compliant_cluster_reports_ready() {
    let (reconciler, store, events) = harness();
    store.insert_policy(policy("security", "strict", opaque_in(&["prod"])));
    store.insert_secret(secret("prod", "a", &[("k", "v")]));
    store.insert_secret(secret("prod", "b", &[]));

    reconciler
        .reconcile(&Trigger::policy("security", "strict"))
        .await
        .unwrap();

    let status = store.policy("security", "strict").unwrap().status.unwrap();
    assert_eq!(status.enforced_secrets, 2);
    assert_eq!(status.violations, 0);
    assert!(status.secret_violations.is_empty());
    let ready = status.conditions.get(READY_CONDITION).unwrap();
    assert_eq!(ready.status, ConditionStatus::True);
    assert_eq!(ready.reason, REASON_COMPLIANT);
    assert_eq!(ready.message, "All 2 secrets comply with the policy");
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_every_pass_refreshes_last_scan_time() {
    let (reconciler, store, _events) = harness();
    store.insert_policy(policy("security", "strict", opaque_in(&["prod"])));
    store.insert_secret(secret("dev", "db", &[]));

    let trigger = Trigger::policy("security", "strict");
    reconciler.reconcile(&trigger).await.unwrap();
    let first = store.policy("security", "strict").unwrap().status.unwrap();
    store.clear_writes();

    tokio::time::sleep(Duration::from_millis(20)).await;
    reconciler.reconcile(&trigger).await.unwrap();
    assert_eq!(store.writes(), vec!["update_policy_status security/strict"]);

    let second = store.policy("security", "strict").unwrap().status.unwrap();
    let scanned_at = |status: &SecretPolicyStatus| {
        DateTime::parse_from_rfc3339(status.last_scan_time.as_deref().unwrap()).unwrap()
    };
    assert!(scanned_at(&second) > scanned_at(&first));
    assert_eq!(second.secret_violations, first.secret_violations);
    assert_eq!(second.violations, first.violations);

    let ready = |status: &SecretPolicyStatus| {
        status.conditions.get(READY_CONDITION).unwrap().last_transition_time.clone()
    };
    assert_eq!(ready(&second), ready(&first));
}

#[tokio::test]
async fn test_spec_change_flips_ready_and_observed_generation() {
    let (reconciler, store, _events) = harness();
    store.insert_policy(policy("security", "strict", opaque_in(&["prod"])));
    store.insert_secret(secret("dev", "db", &[]));

    let trigger = Trigger::policy("security", "strict");
    reconciler.reconcile(&trigger).await.unwrap();
    let before = store.policy("security", "strict").unwrap().status.unwrap();
    assert_eq!(before.conditions.status_of(READY_CONDITION), ConditionStatus::False);

    // Allowing the Secret's namespace flips Ready to True.
    let mut updated = store.policy("security", "strict").unwrap();
    updated.spec.access_rules.allowed_namespaces.push("dev".to_string());
    updated.metadata.generation = Some(2);
    store.insert_policy(updated);

    reconciler.reconcile(&trigger).await.unwrap();
    let after = store.policy("security", "strict").unwrap().status.unwrap();
    assert_eq!(after.conditions.status_of(READY_CONDITION), ConditionStatus::True);
    assert_eq!(after.observed_generation, Some(2));
    assert_eq!(after.enforced_secrets, 1);
    assert!(after
        .conditions
        .get(READY_CONDITION)
        .unwrap()
        .last_transition_time
        .is_some());
}

#[tokio::test]
async fn test_rotation_policy_requeues_after_interval() {
    let (reconciler, store, _events) = harness();
    let mut spec = opaque_in(&["prod"]);
    spec.rotation.enabled = true;
    spec.rotation.interval_days = 7;
    store.insert_policy(policy("security", "rotating", spec));
    store.insert_secret(with_annotation(
        secret("prod", "fresh", &[]),
        LAST_ROTATED_ANNOTATION,
        &chrono::Utc::now().to_rfc3339(),
    ));

    let requeue = reconciler
        .reconcile(&Trigger::policy("security", "rotating"))
        .await
        .unwrap();
    assert_eq!(requeue, Some(Duration::from_secs(7 * 86_400)));
}

#[tokio::test]
async fn test_missing_objects_are_noops() {
    let (reconciler, store, events) = harness();

    assert_eq!(
        reconciler
            .reconcile(&Trigger::policy("security", "gone"))
            .await
            .unwrap(),
        None
    );
    assert_eq!(
        reconciler
            .reconcile(&Trigger::secret("prod", "gone"))
            .await
            .unwrap(),
        None
    );
    assert!(store.writes().is_empty());
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_secret_pass_publishes_events_per_policy_without_status() {
    let (reconciler, store, events) = harness();
    store.insert_policy(policy("security", "b-namespaces", opaque_in(&["prod"])));
    let mut keys = opaque_in(&["dev"]);
    keys.disallowed_keys = vec!["password".to_string()];
    store.insert_policy(policy("security", "a-keys", keys));
    store.insert_secret(secret("dev", "db", &[("password", "x")]));

    let requeue = reconciler
        .reconcile(&Trigger::secret("dev", "db"))
        .await
        .unwrap();
    assert_eq!(requeue, None);

    let recorded = events.events();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].policy, "security/a-keys");
    assert_eq!(recorded[0].message, "Secret dev/db: key password is disallowed");
    assert_eq!(recorded[1].policy, "security/b-namespaces");
    assert_eq!(recorded[1].message, "Secret dev/db: namespace dev is not allowed");

    assert!(store.writes().is_empty());
    assert!(store.policy("security", "a-keys").unwrap().status.is_none());
}

#[tokio::test]
async fn test_list_failure_is_returned_and_writes_no_status() {
    let (reconciler, store, events) = harness();
    let mut existing = policy("security", "strict", opaque_in(&["prod"]));
    existing.metadata.finalizers = Some(vec![POLICY_FINALIZER.to_string()]);
    store.insert_policy(existing);
    store.insert_secret(secret("dev", "db", &[]));
    store.fail(Op::ListSecrets);

    let trigger = Trigger::policy("security", "strict");
    let err = reconciler.reconcile(&trigger).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(store.policy("security", "strict").unwrap().status.is_none());
    assert!(events.events().is_empty());

    store.heal();
    reconciler.reconcile(&trigger).await.unwrap();
    assert_eq!(
        store
            .policy("security", "strict")
            .unwrap()
            .status
            .unwrap()
            .violations,
        1
    );
}

#[tokio::test]
async fn test_status_write_failure_does_not_fail_the_pass() {
    let (reconciler, store, events) = harness();
    let mut existing = policy("security", "strict", opaque_in(&["prod"]));
    existing.metadata.finalizers = Some(vec![POLICY_FINALIZER.to_string()]);
    store.insert_policy(existing);
    store.insert_secret(secret("dev", "db", &[]));
    store.fail(Op::UpdatePolicyStatus);

    let result = reconciler
        .reconcile(&Trigger::policy("security", "strict"))
        .await;
    assert!(result.is_ok());
    assert!(store.policy("security", "strict").unwrap().status.is_none());
    assert_eq!(events.messages(), vec!["Secret dev/db: namespace dev is not allowed"]);
}

#[tokio::test]
async fn test_failed_pass_grows_backoff_and_success_resets_it() {
    let (reconciler, store, _events) = harness();
    store.insert_secret(secret("dev", "db", &[]));
    store.fail(Op::ListPolicies);

    let trigger = Trigger::secret("dev", "db");
    assert!(reconciler.reconcile(&trigger).await.is_err());
    assert_eq!(reconciler.next_backoff(&trigger.key()), (60, 1));
    assert_eq!(reconciler.next_backoff(&trigger.key()), (60, 2));

    store.heal();
    reconciler.reconcile(&trigger).await.unwrap();
    assert_eq!(reconciler.next_backoff(&trigger.key()), (60, 1));
}
