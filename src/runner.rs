use thiserror::Error;

use crate::client::{FetchError, InterestFetcher};
use crate::config::{EventConfig, StoreSettings, TrackerConfig};
use crate::domain::Outcome;
use crate::normalize::{normalize, ParseError};
use crate::store::{self, LoadStatus, StoreError};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("SCRAPE_FAILED: {0}")]
    Fetch(#[from] FetchError),
    #[error("PARSE_FAILED: {0}")]
    Parse(#[from] ParseError),
    #[error("STORE_FAILED: {0}")]
    Persist(#[from] StoreError),
}

#[derive(Debug)]
pub struct Observation {
    pub value: u64,
    pub outcome: Outcome,
    pub load_status: LoadStatus,
}

/// What happened to one event during one run.
#[derive(Debug)]
pub struct RunReport {
    pub event_code: String,
    pub timestamp: String,
    pub result: Result<Observation, RunError>,
}

impl RunReport {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.result.as_ref().ok().map(|obs| obs.outcome)
    }

    /// One line with a stable `[OK]`, `[SKIP]` or `[ERROR]` prefix. A record
    /// rebuilt from an undecodable file gets a trailing `| recovered`.
    pub fn summary_line(&self) -> String {
        let code = &self.event_code;
        let ts = &self.timestamp;
        match &self.result {
            Ok(obs) if obs.load_status.is_recovered() => {
                let line = Self::observation_line(code, ts, obs);
                format!("{} | recovered", line)
            }
            Ok(obs) => Self::observation_line(code, ts, obs),
            Err(e) => format!("[ERROR] {} | {}", code, e),
        }
    }

    fn observation_line(code: &str, ts: &str, obs: &Observation) -> String {
        match obs.outcome {
            Outcome::Appended => format!("[OK] {} | Interested: {} | {}", code, obs.value, ts),
            Outcome::Unchanged => {
                format!("[SKIP] {} | Interest unchanged ({}) | {}", code, obs.value, ts)
            }
            Outcome::TimestampCollision => format!("[SKIP] {} | Timestamp exists | {}", code, ts),
            Outcome::Stale => {
                format!("[SKIP] {} | Timestamp older than latest entry | {}", code, ts)
            }
        }
    }
}

/// Fetch, normalize and record one observation for `event`.
pub async fn run_event(
    fetcher: &dyn InterestFetcher,
    event: &EventConfig,
    settings: &StoreSettings,
    timestamp: &str,
) -> RunReport {
    let result = observe(fetcher, event, settings, timestamp).await;

    match &result {
        Ok(obs) if obs.outcome.is_append() => {
            tracing::info!("{}: recorded {} at {}", event.code, obs.value, timestamp)
        }
        Ok(obs) => tracing::debug!("{}: {} ({})", event.code, obs.outcome, obs.value),
        Err(e) => tracing::error!("{}: {}", event.code, e),
    }

    RunReport {
        event_code: event.code.clone(),
        timestamp: timestamp.to_string(),
        result,
    }
}

async fn observe(
    fetcher: &dyn InterestFetcher,
    event: &EventConfig,
    settings: &StoreSettings,
    timestamp: &str,
) -> Result<Observation, RunError> {
    let raw = fetcher.fetch(event).await?;
    tracing::debug!("{}: raw interest text {:?}", event.code, raw);
    let value = normalize(&raw)?;

    let path = store::record_path(&settings.data_dir, &event.code);
    let (mut record, load_status) =
        store::load_with_status(&path, &settings.identity_for(event))?;
    let outcome = record.apply_observation(timestamp, value, settings.policy);
    store::save(&path, &record)?;

    Ok(Observation {
        value,
        outcome,
        load_status,
    })
}

/// Run every configured event in order, all stamped with `timestamp`.
pub async fn run_all(
    fetcher: &dyn InterestFetcher,
    config: &TrackerConfig,
    timestamp: &str,
) -> Vec<RunReport> {
    let mut reports = Vec::with_capacity(config.events.len());
    for event in &config.events {
        reports.push(run_event(fetcher, event, &config.store, timestamp).await);
    }
    reports
}
