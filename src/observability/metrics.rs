//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `secret_policy_reconciliations_total{kind}` - Reconciliations by trigger kind
//! - `secret_policy_reconciliation_errors_total` - Failed reconciliations
//! - `secret_policy_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `secret_policy_requeues_total{reason}` - Requeues scheduled by the controllers
//! - `secret_policy_violations_detected_total` - Violations found across all passes
//! - `secret_policy_violations{policy}` - Violations found by the last scan of each policy
//! - `secret_policy_status_update_failures_total` - Status writes that failed
//! - `secret_policy_admission_decisions_total{decision}` - Admission webhook outcomes

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secret_policy_reconciliations_total",
            "Total number of reconciliations by trigger kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_policy_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "secret_policy_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secret_policy_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static VIOLATIONS_DETECTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_policy_violations_detected_total",
        "Total number of policy violations detected",
    )
    .expect("Failed to create VIOLATIONS_DETECTED_TOTAL metric - this should never happen")
});

static POLICY_VIOLATIONS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "secret_policy_violations",
            "Violations found by the last scan of each SecretPolicy",
        ),
        &["policy"],
    )
    .expect("Failed to create POLICY_VIOLATIONS metric - this should never happen")
});

static STATUS_UPDATE_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "secret_policy_status_update_failures_total",
        "Total number of failed SecretPolicy status updates",
    )
    .expect("Failed to create STATUS_UPDATE_FAILURES_TOTAL metric - this should never happen")
});

static ADMISSION_DECISIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "secret_policy_admission_decisions_total",
            "Total number of admission decisions by outcome",
        ),
        &["decision"],
    )
    .expect("Failed to create ADMISSION_DECISIONS_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VIOLATIONS_DETECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POLICY_VIOLATIONS.clone()))?;
    REGISTRY.register(Box::new(STATUS_UPDATE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ADMISSION_DECISIONS_TOTAL.clone()))?;

    Ok(())
}

/// Render the registry in the Prometheus text format
pub fn encode() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_violations_detected(count: u64) {
    VIOLATIONS_DETECTED_TOTAL.inc_by(count);
}

pub fn set_policy_violations(policy: &str, count: i32) {
    POLICY_VIOLATIONS
        .with_label_values(&[policy])
        .set(i64::from(count));
}

/// Drop the gauge series of a deleted policy
pub fn remove_policy_violations(policy: &str) {
    let _ = POLICY_VIOLATIONS.remove_label_values(&[policy]);
}

pub fn increment_status_update_failures() {
    STATUS_UPDATE_FAILURES_TOTAL.inc();
}

pub fn increment_admission_decisions(decision: &str) {
    ADMISSION_DECISIONS_TOTAL.with_label_values(&[decision]).inc();
}
