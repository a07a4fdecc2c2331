use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{EventRecord, RecordIdentity};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How [`load_with_status`] arrived at the record it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Existing,
    Missing,
    /// The file existed but its content could not be decoded; a fresh record was
    /// returned in its place.
    Recovered(String),
}

impl LoadStatus {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

pub fn record_path(data_dir: &Path, event_code: &str) -> PathBuf {
    data_dir.join(format!("{}.json", event_code))
}

/// Load the record at `path`, falling back to a fresh one when the file is
/// missing or its content cannot be decoded. Only a failing read is an error.
pub fn load(path: &Path, identity: &RecordIdentity) -> StoreResult<EventRecord> {
    load_with_status(path, identity).map(|(record, _)| record)
}

pub fn load_with_status(
    path: &Path,
    identity: &RecordIdentity,
) -> StoreResult<(EventRecord, LoadStatus)> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("no record at {}, starting fresh", path.display());
            return Ok((EventRecord::new(identity), LoadStatus::Missing));
        }
        // Not UTF-8: the content is damaged, not the storage.
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return Ok(recovered(path, identity, format!("not UTF-8: {}", e)));
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str::<EventRecord>(&content) {
        Ok(record) => {
            if record.event_code != identity.event_code {
                tracing::warn!(
                    "{} holds event {} while {} was expected; keeping stored identity",
                    path.display(),
                    record.event_code,
                    identity.event_code
                );
            }
            Ok((record, LoadStatus::Existing))
        }
        Err(e) => Ok(recovered(path, identity, format!("malformed: {}", e))),
    }
}

fn recovered(path: &Path, identity: &RecordIdentity, reason: String) -> (EventRecord, LoadStatus) {
    tracing::warn!("{} is {}; starting a fresh record", path.display(), reason);
    (EventRecord::new(identity), LoadStatus::Recovered(reason))
}

/// Replace the file at `path` with `record`. The write goes to a temporary
/// file in the same directory which is then renamed over the target.
pub fn save(path: &Path, record: &EventRecord) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut payload = serde_json::to_vec_pretty(record)?;
    payload.push(b'\n');

    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(&payload).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!(
        "saved {} ({} history entries)",
        path.display(),
        record.history.len()
    );
    Ok(())
}
