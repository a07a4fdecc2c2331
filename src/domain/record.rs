use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Fields fixed at creation time. Used to initialise a fresh record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIdentity {
    pub event_code: String,
    pub source: String,
    pub timezone: String,
}

/// When `last_updated` moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LastUpdatedPolicy {
    /// Only when a new history entry is appended.
    #[default]
    OnAppend,
    /// On every observation, appended or not.
    EveryRun,
}

impl LastUpdatedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnAppend => "on-append",
            Self::EveryRun => "every-run",
        }
    }
}

/// Persisted state of one tracked event.
///
/// `history` is keyed by civil timestamp. Keys share one fixed offset and
/// minute precision, so lexicographic order is chronological order and the
/// last key of the map is the latest observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventCode")]
    pub event_code: String,
    pub source: String,
    pub timezone: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub history: BTreeMap<String, u64>,
    /// Top-level keys written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventRecord {
    pub fn new(identity: &RecordIdentity) -> Self {
        Self {
            event_code: identity.event_code.clone(),
            source: identity.source.clone(),
            timezone: identity.timezone.clone(),
            last_updated: None,
            history: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn latest(&self) -> Option<(&str, u64)> {
        self.history
            .last_key_value()
            .map(|(timestamp, value)| (timestamp.as_str(), *value))
    }

    pub fn last_value(&self) -> Option<u64> {
        self.latest().map(|(_, value)| value)
    }

    /// Decide whether `value` observed at `timestamp` becomes a new history
    /// entry. Existing entries are never touched and `last_updated` never
    /// moves backwards.
    pub fn apply_observation(
        &mut self,
        timestamp: &str,
        value: u64,
        policy: LastUpdatedPolicy,
    ) -> Outcome {
        let outcome = match self.latest() {
            Some((_, last)) if last == value => Outcome::Unchanged,
            _ if self.history.contains_key(timestamp) => Outcome::TimestampCollision,
            Some((latest, _)) if timestamp < latest => Outcome::Stale,
            _ => {
                self.history.insert(timestamp.to_string(), value);
                Outcome::Appended
            }
        };

        let advances = self
            .last_updated
            .as_deref()
            .is_none_or(|current| timestamp > current);
        if advances && (outcome.is_append() || policy == LastUpdatedPolicy::EveryRun) {
            self.last_updated = Some(timestamp.to_string());
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: &str = "2024-05-01T10:00+05:30";
    const T2: &str = "2024-05-01T10:05+05:30";
    const T3: &str = "2024-05-01T10:10+05:30";

    fn record() -> EventRecord {
        EventRecord::new(&RecordIdentity {
            event_code: "ET00311251".to_string(),
            source: "BookMyShow".to_string(),
            timezone: "Asia/Kolkata".to_string(),
        })
    }

    #[test]
    fn last_value_uses_greatest_key_not_insertion_order() {
        let mut rec = record();
        rec.history.insert(T3.to_string(), 300);
        rec.history.insert(T1.to_string(), 100);

        assert_eq!(rec.last_value(), Some(300));
        assert_eq!(record().last_value(), None);
    }

    #[test]
    fn end_to_end_scenario() {
        let mut rec = record();
        let policy = LastUpdatedPolicy::OnAppend;

        assert_eq!(rec.apply_observation(T1, 64_600, policy), Outcome::Appended);
        assert_eq!(rec.history, BTreeMap::from([(T1.to_string(), 64_600)]));
        assert_eq!(rec.last_updated.as_deref(), Some(T1));

        assert_eq!(rec.apply_observation(T2, 64_600, policy), Outcome::Unchanged);
        assert_eq!(rec.history.len(), 1);
        assert_eq!(rec.last_updated.as_deref(), Some(T1));

        assert_eq!(
            rec.apply_observation(T1, 70_000, policy),
            Outcome::TimestampCollision
        );
        assert_eq!(rec.history[T1], 64_600);

        assert_eq!(rec.apply_observation(T3, 70_000, policy), Outcome::Appended);
        assert_eq!(
            rec.history,
            BTreeMap::from([(T1.to_string(), 64_600), (T3.to_string(), 70_000)])
        );
        assert_eq!(rec.last_updated.as_deref(), Some(T3));
    }

    #[test]
    fn repeated_observation_never_appends_twice() {
        for policy in [LastUpdatedPolicy::OnAppend, LastUpdatedPolicy::EveryRun] {
            let mut rec = record();
            rec.apply_observation(T1, 500, policy);
            let second = rec.apply_observation(T1, 500, policy);

            assert!(matches!(
                second,
                Outcome::Unchanged | Outcome::TimestampCollision
            ));
            assert_eq!(rec.history.len(), 1);
        }
    }

    #[test]
    fn unchanged_value_skips_at_any_timestamp() {
        let mut rec = record();
        rec.history.insert(T2.to_string(), 42);
        let before = rec.history.clone();

        for t in [T1, T2, T3] {
            assert_eq!(
                rec.apply_observation(t, 42, LastUpdatedPolicy::OnAppend),
                Outcome::Unchanged
            );
        }
        assert_eq!(rec.history, before);
        assert_eq!(rec.last_updated, None);
    }

    #[test]
    fn collision_keeps_existing_value() {
        let mut rec = record();
        rec.history.insert(T1.to_string(), 10);
        rec.history.insert(T2.to_string(), 20);

        for value in [0, 11, 20, u64::MAX] {
            let outcome = rec.apply_observation(T1, value, LastUpdatedPolicy::OnAppend);
            assert_ne!(outcome, Outcome::Appended);
            assert_eq!(rec.history[T1], 10);
        }
    }

    #[test]
    fn older_timestamp_is_not_inserted_behind_latest() {
        let mut rec = record();
        rec.history.insert(T3.to_string(), 30);

        assert_eq!(
            rec.apply_observation(T2, 31, LastUpdatedPolicy::OnAppend),
            Outcome::Stale
        );
        assert!(!rec.history.contains_key(T2));
    }

    #[test]
    fn every_run_policy_advances_last_updated_on_skips() {
        let mut rec = record();
        let policy = LastUpdatedPolicy::EveryRun;
        rec.apply_observation(T1, 7, policy);

        assert_eq!(rec.apply_observation(T2, 7, policy), Outcome::Unchanged);
        assert_eq!(rec.last_updated.as_deref(), Some(T2));
        assert_eq!(rec.history.len(), 1);
    }

    #[test]
    fn every_run_policy_never_moves_last_updated_backwards() {
        let mut rec = record();
        let policy = LastUpdatedPolicy::EveryRun;
        rec.apply_observation(T3, 1, policy);

        assert_eq!(rec.apply_observation(T1, 2, policy), Outcome::Stale);
        assert_eq!(rec.last_updated.as_deref(), Some(T3));

        assert_eq!(rec.apply_observation(T2, 1, policy), Outcome::Unchanged);
        assert_eq!(rec.last_updated.as_deref(), Some(T3));
    }

    #[test]
    fn unknown_top_level_keys_survive_a_round_trip() {
        let text = r#"{"eventCode":"ET00311251","source":"BookMyShow","timezone":"Asia/Kolkata","last_updated":null,"history":{},"title":"NTR 31"}"#;

        let rec: EventRecord = serde_json::from_str(text).unwrap();
        assert_eq!(rec.extra["title"], "NTR 31");

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["title"], "NTR 31");
        assert_eq!(value["eventCode"], "ET00311251");
    }

    #[test]
    fn serializes_with_persisted_key_names() {
        let mut rec = record();
        rec.apply_observation(T1, 64_600, LastUpdatedPolicy::OnAppend);

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["eventCode"], "ET00311251");
        assert_eq!(value["timezone"], "Asia/Kolkata");
        assert_eq!(value["last_updated"], T1);
        assert_eq!(value["history"][T1], 64_600);
    }
}
