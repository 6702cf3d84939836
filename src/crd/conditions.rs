//! # Conditions
//!
//! Status conditions keyed by condition type.
//!
//! On the wire conditions are the usual Kubernetes list of
//! `{type, status, reason, message, lastTransitionTime}`. In memory they are a map
//! from condition type to state so that writers replace a condition with
//! [`Conditions::upsert`] instead of scanning the list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status value of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single condition, without its type key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionState {
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    /// RFC3339 time of the last status change
    pub last_transition_time: Option<String>,
}

/// Condition represents a condition of a resource (wire form)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

/// Conditions keyed by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct Conditions(BTreeMap<String, ConditionState>);

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the condition of the given type
    ///
    /// The transition time is carried over when the status value is unchanged,
    /// otherwise it is set to `now`.
    pub fn upsert(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        now: &str,
    ) {
        let last_transition_time = match self.0.get(condition_type) {
            Some(existing) if existing.status == status => existing
                .last_transition_time
                .clone()
                .or_else(|| Some(now.to_string())),
            _ => Some(now.to_string()),
        };
        self.0.insert(
            condition_type.to_string(),
            ConditionState {
                status,
                reason: reason.to_string(),
                message: message.into(),
                last_transition_time,
            },
        );
    }

    #[must_use]
    pub fn get(&self, condition_type: &str) -> Option<&ConditionState> {
        self.0.get(condition_type)
    }

    /// Status of the condition, `Unknown` if it was never set
    #[must_use]
    pub fn status_of(&self, condition_type: &str) -> ConditionStatus {
        self.get(condition_type)
            .map_or(ConditionStatus::Unknown, |c| c.status)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionState)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Vec<Condition>> for Conditions {
    fn from(list: Vec<Condition>) -> Self {
        Self(
            list.into_iter()
                .map(|c| {
                    (
                        c.r#type,
                        ConditionState {
                            status: ConditionStatus::parse(&c.status),
                            reason: c.reason.unwrap_or_default(),
                            message: c.message.unwrap_or_default(),
                            last_transition_time: c.last_transition_time,
                        },
                    )
                })
                .collect(),
        )
    }
}

impl From<Conditions> for Vec<Condition> {
    fn from(conditions: Conditions) -> Self {
        conditions
            .0
            .into_iter()
            .map(|(r#type, state)| Condition {
                r#type,
                status: state.status.as_str().to_string(),
                last_transition_time: state.last_transition_time,
                reason: Some(state.reason),
                message: Some(state.message),
            })
            .collect()
    }
}
