//! Result Aggregator
//!
//! Maps a verdict to the persistence payload:
//!
//! | result          | payload      |
//! |-----------------|--------------|
//! | `True`          | `true`       |
//! | `False`         | `false`      |
//! | `Indeterminate` | `null`       |
//! | `NotApplicable` | key omitted  |
//!
//! Whenever the policy column is written, `policy_violations_note` is written
//! with it: the rationale when non-empty, otherwise `null`.

use crate::types::{AggregatedVerdict, CheckName, CheckResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Column carrying the policy screening rationale
pub const POLICY_NOTE_COLUMN: &str = "policy_violations_note";

/// Column → value map handed to the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistencePayload(Map<String, Value>);

impl PersistencePayload {
    pub fn from_verdict(verdict: &AggregatedVerdict) -> Self {
        let mut map = Map::new();
        for (name, outcome) in verdict.iter() {
            if let Some(value) = result_to_value(outcome.result) {
                map.insert(name.column().to_string(), value);
            }
        }

        if map.contains_key(CheckName::PolicyViolation.column()) {
            let note = verdict
                .outcome(CheckName::PolicyViolation)
                .and_then(|o| o.rationale.as_deref())
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map_or(Value::Null, |r| Value::String(r.to_string()));
            map.insert(POLICY_NOTE_COLUMN.to_string(), note);
        }

        Self(map)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Policy screening rationale, if one was recorded
    pub fn note(&self) -> Option<&str> {
        self.0.get(POLICY_NOTE_COLUMN).and_then(Value::as_str)
    }

    /// Check columns present in the payload with their boolean view
    pub fn check_columns(&self) -> impl Iterator<Item = (CheckName, Option<bool>)> + '_ {
        CheckName::ALL.into_iter().filter_map(|name| {
            self.0
                .get(name.column())
                .map(|value| (name, value.as_bool()))
        })
    }

    /// Reverse mapping: omitted → `NotApplicable`, `null` → `Indeterminate`
    pub fn to_results(&self) -> BTreeMap<CheckName, CheckResult> {
        CheckName::ALL
            .into_iter()
            .map(|name| (name, value_to_result(self.0.get(name.column()))))
            .collect()
    }

    /// Overwrite this payload's columns with those carried by `newer`
    pub fn merge_from(&mut self, newer: &PersistencePayload) {
        for (column, value) in &newer.0 {
            self.0.insert(column.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Payload value for a result; `None` means "omit the column"
pub fn result_to_value(result: CheckResult) -> Option<Value> {
    match result {
        CheckResult::True => Some(Value::Bool(true)),
        CheckResult::False => Some(Value::Bool(false)),
        CheckResult::Indeterminate => Some(Value::Null),
        CheckResult::NotApplicable => None,
    }
}

/// Result for a payload value; anything but a boolean reads as `Indeterminate`
pub fn value_to_result(value: Option<&Value>) -> CheckResult {
    match value {
        None => CheckResult::NotApplicable,
        Some(Value::Bool(b)) => CheckResult::from_bool(*b),
        Some(_) => CheckResult::Indeterminate,
    }
}
