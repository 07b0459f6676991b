//! Observed state written back by the reconciler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition type reporting the outcome of the last reconciliation
pub const READY: &str = "Ready";

/// Reason recorded on a successful pass
pub const REASON_SUCCESS: &str = "Success";

/// Reason recorded on a failed pass
pub const REASON_ERROR: &str = "Error";

/// Observed state of a `ListGithubDeployments` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDeploymentsStatus {
    /// Conditions, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Sanitized deployment records, ordered by id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<serde_json::Value>,
}

impl ListDeploymentsStatus {
    /// Find a condition by type
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// The `Ready` condition, if any pass has completed
    pub fn ready(&self) -> Option<&Condition> {
        self.condition(READY)
    }

    /// Insert or update a condition keyed by its type
    ///
    /// The transition time is only moved when the status flips; reason,
    /// message and observed generation always take the new values.
    pub fn set_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                if existing.status != condition.status {
                    existing.status = condition.status;
                    existing.last_transition_time = condition.last_transition_time;
                }
                existing.reason = condition.reason;
                existing.message = condition.message;
                existing.observed_generation = condition.observed_generation;
            }
            None => self.conditions.push(condition),
        }
    }

    /// Remove a condition by type, returning whether one was present
    pub fn remove_condition(&mut self, condition_type: &str) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.condition_type != condition_type);
        before != self.conditions.len()
    }
}

/// A typed observation with reason and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: ConditionStatus,

    /// Generation of the object this condition was computed from
    #[serde(default)]
    pub observed_generation: i64,

    pub last_transition_time: DateTime<Utc>,

    pub reason: String,

    #[serde(default)]
    pub message: String,
}

impl Condition {
    /// `Ready=True` after a successful pass
    pub fn ready(observed_generation: i64) -> Self {
        Self {
            condition_type: READY.to_string(),
            status: ConditionStatus::True,
            observed_generation,
            last_transition_time: Utc::now(),
            reason: REASON_SUCCESS.to_string(),
            message: REASON_SUCCESS.to_string(),
        }
    }

    /// `Ready=False` carrying the failure message
    pub fn not_ready(observed_generation: i64, message: impl Into<String>) -> Self {
        Self {
            condition_type: READY.to_string(),
            status: ConditionStatus::False,
            observed_generation,
            last_transition_time: Utc::now(),
            reason: REASON_ERROR.to_string(),
            message: message.into(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_set_condition_inserts_once() {
        let mut status = ListDeploymentsStatus::default();
        status.set_condition(Condition::ready(1));
        status.set_condition(Condition::not_ready(2, "boom"));
        status.set_condition(Condition::ready(3));

        assert_eq!(status.conditions.len(), 1);
        let ready = status.ready().unwrap();
        assert!(ready.is_true());
        assert_eq!(ready.observed_generation, 3);
        assert_eq!(ready.reason, REASON_SUCCESS);
    }

    #[test]
    fn test_transition_time_kept_when_status_unchanged() {
        let mut status = ListDeploymentsStatus::default();
        let first = Condition::not_ready(1, "first");
        let first_time = first.last_transition_time;
        status.set_condition(first);

        let mut second = Condition::not_ready(1, "second");
        second.last_transition_time = first_time + Duration::seconds(60);
        status.set_condition(second);

        let ready = status.ready().unwrap();
        assert_eq!(ready.last_transition_time, first_time);
        assert_eq!(ready.message, "second");
    }

    #[test]
    fn test_transition_time_moves_on_flip() {
        let mut status = ListDeploymentsStatus::default();
        status.set_condition(Condition::not_ready(1, "down"));

        let mut up = Condition::ready(1);
        up.last_transition_time = Utc::now() + Duration::seconds(60);
        let flipped_at = up.last_transition_time;
        status.set_condition(up);

        assert_eq!(status.ready().unwrap().last_transition_time, flipped_at);
    }

    #[test]
    fn test_remove_condition() {
        let mut status = ListDeploymentsStatus::default();
        status.set_condition(Condition::ready(1));
        assert!(status.remove_condition(READY));
        assert!(!status.remove_condition(READY));
        assert!(status.ready().is_none());
    }

    #[test]
    fn test_condition_wire_format() {
        let json = serde_json::to_value(Condition::not_ready(4, "rate limited")).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "False");
        assert_eq!(json["observedGeneration"], 4);
        assert_eq!(json["reason"], "Error");
        assert_eq!(json["message"], "rate limited");
        assert!(json["lastTransitionTime"].is_string());
    }
}
