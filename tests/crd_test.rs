//! CRD generation and wire-format tests

use kube::core::CustomResourceExt;
use secret_policy_controller::crd::{ConditionStatus, SecretPolicy, SecretPolicyStatus};
use serde_json::json;

#[test]
fn test_crd_identity() {
    let crd = SecretPolicy::crd();
    assert_eq!(crd.spec.group, "compliance.security.local");
    assert_eq!(crd.spec.names.kind, "SecretPolicy");
    assert_eq!(crd.spec.names.plural, "secretpolicies");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(
        crd.spec.names.short_names,
        Some(vec!["sp".to_string()])
    );

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version.served);
    assert!(version.storage);
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());
}

#[test]
fn test_crd_schema_uses_camel_case_fields() {
    let crd = SecretPolicy::crd();
    let schema = serde_json::to_value(&crd.spec.versions[0].schema).unwrap();
    let spec = &schema["openAPIV3Schema"]["properties"]["spec"]["properties"];

    for field in ["allowedTypes", "disallowedKeys", "encryption", "accessRules", "rotation"] {
        assert!(spec.get(field).is_some(), "missing spec.{field}");
    }
    assert!(spec["encryption"]["properties"].get("externalKMS").is_some());
    assert!(spec["encryption"]["properties"].get("base64Mode").is_some());

    let status = &schema["openAPIV3Schema"]["properties"]["status"]["properties"];
    for field in ["enforcedSecrets", "violations", "secretViolations", "lastScanTime", "conditions"] {
        assert!(status.get(field).is_some(), "missing status.{field}");
    }
}

#[test]
fn test_crd_yaml_renders() {
    let yaml = serde_yaml::to_string(&SecretPolicy::crd()).unwrap();
    assert!(yaml.contains("secretpolicies.compliance.security.local"));
}

#[test]
fn test_status_conditions_round_trip_as_list() {
    let status: SecretPolicyStatus = serde_json::from_value(json!({
        "enforcedSecrets": 3,
        "violations": 1,
        "secretViolations": [
            { "name": "db", "namespace": "dev", "violations": ["namespace dev is not allowed"] }
        ],
        "lastScanTime": "2025-01-01T00:00:00+00:00",
        "conditions": [
            {
                "type": "Ready",
                "status": "False",
                "reason": "ViolationsFound",
                "message": "1 violations found in 1 secrets",
                "lastTransitionTime": "2025-01-01T00:00:00+00:00"
            }
        ]
    }))
    .unwrap();

    assert_eq!(status.conditions.status_of("Ready"), ConditionStatus::False);
    assert_eq!(status.secret_violations[0].violations.len(), 1);

    let value = serde_json::to_value(&status).unwrap();
    assert!(value["conditions"].is_array());
    assert_eq!(value["conditions"][0]["type"], "Ready");
    assert_eq!(value["conditions"][0]["reason"], "ViolationsFound");
}

#[test]
fn test_policy_manifest_parses() {
    let manifest = r#"
apiVersion: compliance.security.local/v1alpha1
kind: SecretPolicy
metadata:
  name: production-secrets
  namespace: security
spec:
  allowedTypes: ["Opaque", "kubernetes.io/tls"]
  disallowedKeys: ["password"]
  encryption:
    enforceBase64: true
    base64Mode: strict
    externalKMS: true
  accessRules:
    allowedNamespaces: ["prod"]
  rotation:
    enabled: true
    intervalDays: 30
"#;
    let policy: SecretPolicy = serde_yaml::from_str(manifest).unwrap();
    assert_eq!(policy.spec.allowed_types.len(), 2);
    assert!(policy.spec.encryption.external_kms);
    assert_eq!(policy.spec.rotation.interval_days, 30);
    assert!(policy.status.is_none());
}
