use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::client::RetryPolicy;
use crate::domain::{parse_utc_offset, LastUpdatedPolicy, OffsetError, RecordIdentity};

pub const DEFAULT_SOURCE: &str = "BookMyShow";
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
pub const DEFAULT_UTC_OFFSET: &str = "+05:30";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug, Default)]
#[command(
    name = "interest-tracker",
    about = "Records the interest count of event pages as a JSON history"
)]
pub struct Cli {
    /// Event code to track; also names the history file
    #[arg(long, env = "INTEREST_EVENT_CODE")]
    pub event_code: Option<String>,

    /// Event page URL
    #[arg(long, env = "INTEREST_EVENT_URL")]
    pub url: Option<String>,

    /// Provenance label stored in new records
    #[arg(long, env = "INTEREST_SOURCE")]
    pub source: Option<String>,

    /// Directory holding one <event-code>.json per event
    #[arg(long, env = "INTEREST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Timezone label stored in new records
    #[arg(long, env = "INTEREST_TIMEZONE")]
    pub timezone: Option<String>,

    /// Offset used to render timestamps (+HH:MM)
    #[arg(long, env = "INTEREST_UTC_OFFSET", allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Fetch attempts per event
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base delay in seconds, multiplied by the attempt number
    #[arg(long)]
    pub base_delay: Option<f64>,

    /// When last_updated advances
    #[arg(long, value_enum)]
    pub last_updated: Option<LastUpdatedPolicy>,

    /// Exit with status 1 when any event fails
    #[arg(long)]
    pub strict: bool,

    /// Config file path (defaults to <config dir>/interest-tracker/config.toml)
    #[arg(long, env = "INTEREST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path
    #[arg(long, env = "INTEREST_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no events configured: pass --event-code and --url or add [[events]] to the config file")]
    NoEvents,
    #[error("--event-code and --url must be given together")]
    IncompleteEvent,
    #[error("event {0} is configured more than once")]
    DuplicateEvent(String),
    #[error("invalid event code {0:?}")]
    InvalidEventCode(String),
    #[error("max retries must be at least 1")]
    InvalidRetries,
    #[error("invalid base delay {0}")]
    InvalidDelay(f64),
    #[error(transparent)]
    Offset(#[from] OffsetError),
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub source: Option<String>,
    pub timezone: Option<String>,
    pub utc_offset: Option<String>,
    pub max_retries: Option<u32>,
    pub base_delay: Option<f64>,
    pub last_updated: Option<LastUpdatedPolicy>,
    pub strict: Option<bool>,
    #[serde(default)]
    pub events: Vec<EventEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventEntry {
    pub code: String,
    pub url: String,
    pub source: Option<String>,
}

impl ConfigFile {
    pub fn load() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("interest-tracker").join("config.toml");
        let content = std::fs::read_to_string(config_path).ok()?;
        toml::from_str(&content).ok()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventConfig {
    pub code: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub data_dir: PathBuf,
    pub timezone: String,
    pub offset: FixedOffset,
    pub policy: LastUpdatedPolicy,
}

impl StoreSettings {
    pub fn identity_for(&self, event: &EventConfig) -> RecordIdentity {
        RecordIdentity {
            event_code: event.code.clone(),
            source: event.source.clone(),
            timezone: self.timezone.clone(),
        }
    }
}

/// Everything one invocation needs, resolved from CLI and config file.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub events: Vec<EventConfig>,
    pub store: StoreSettings,
    pub retry: RetryPolicy,
    pub strict: bool,
}

impl TrackerConfig {
    /// Merge CLI arguments over the config file. A CLI event replaces a file
    /// event with the same code.
    pub fn resolve(cli: &Cli, file: ConfigFile) -> Result<Self, ConfigError> {
        let source = cli
            .source
            .clone()
            .or(file.source)
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        let mut events: Vec<EventConfig> = file
            .events
            .into_iter()
            .map(|entry| EventConfig {
                code: entry.code,
                url: entry.url,
                source: entry.source.unwrap_or_else(|| source.clone()),
            })
            .collect();

        match (&cli.event_code, &cli.url) {
            (Some(code), Some(url)) => {
                events.retain(|event| &event.code != code);
                events.push(EventConfig {
                    code: code.clone(),
                    url: url.clone(),
                    source: source.clone(),
                });
            }
            (None, None) => {}
            _ => return Err(ConfigError::IncompleteEvent),
        }

        if events.is_empty() {
            return Err(ConfigError::NoEvents);
        }
        let mut seen = HashSet::new();
        for event in &events {
            validate_event_code(&event.code)?;
            if !seen.insert(event.code.as_str()) {
                return Err(ConfigError::DuplicateEvent(event.code.clone()));
            }
        }

        let offset = parse_utc_offset(
            cli.utc_offset
                .as_deref()
                .or(file.utc_offset.as_deref())
                .unwrap_or(DEFAULT_UTC_OFFSET),
        )?;

        let max_attempts = cli.max_retries.or(file.max_retries).unwrap_or(5);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetries);
        }
        let base_delay = cli.base_delay.or(file.base_delay).unwrap_or(2.0);
        let base_delay = Duration::try_from_secs_f64(base_delay)
            .map_err(|_| ConfigError::InvalidDelay(base_delay))?;

        Ok(Self {
            events,
            store: StoreSettings {
                data_dir: cli
                    .data_dir
                    .clone()
                    .or(file.data_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                timezone: cli
                    .timezone
                    .clone()
                    .or(file.timezone)
                    .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
                offset,
                policy: cli.last_updated.or(file.last_updated).unwrap_or_default(),
            },
            retry: RetryPolicy {
                max_attempts,
                base_delay,
                ..RetryPolicy::default()
            },
            strict: cli.strict || file.strict.unwrap_or(false),
        })
    }
}

// Codes become file names under the data directory.
fn validate_event_code(code: &str) -> Result<(), ConfigError> {
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEventCode(code.to_string()))
    }
}
