//! CSV-backed typing dataset.
//!
//! Two files: the read-only base dataset and an extension file new samples
//! are appended to. Both share the header
//! `participant, session, key1, key2, <timing columns>`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use keyprint::{Digraph, TIMING_KEYS};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One dataset row keyed by column name.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{}: missing or empty, cannot append without a header", .0.display())]
    NoHeader(PathBuf),
}

/// Header written when no base dataset exists to copy it from.
pub fn default_header() -> Vec<&'static str> {
    let mut header = vec!["participant", "session", "key1", "key2"];
    header.extend(TIMING_KEYS);
    header
}

pub struct TypingStore {
    base: PathBuf,
    ext: PathBuf,
    append_lock: Mutex<()>,
}

impl TypingStore {
    pub fn new(base: impl Into<PathBuf>, ext: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            ext: ext.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn ext_path(&self) -> &Path {
        &self.ext
    }

    /// Creates the extension file's directory, and the file itself with the
    /// base dataset's header if it does not exist yet.
    pub fn bootstrap(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.ext.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        if self.ext.is_file() {
            return Ok(());
        }

        let header: Vec<String> = match self.base_header()? {
            Some(h) => {
                info!(base = %self.base.display(), ext = %self.ext.display(), "copying dataset header");
                h
            }
            None => {
                warn!(base = %self.base.display(), "base dataset unavailable, using default header");
                default_header().into_iter().map(String::from).collect()
            }
        };

        let csv_err = |source| StoreError::Csv {
            path: self.ext.clone(),
            source,
        };
        let mut w = csv::Writer::from_path(&self.ext).map_err(csv_err)?;
        w.write_record(&header).map_err(csv_err)?;
        w.flush().map_err(|source| StoreError::Io {
            path: self.ext.clone(),
            source,
        })?;
        Ok(())
    }

    fn base_header(&self) -> Result<Option<Vec<String>>, StoreError> {
        if !self.base.is_file() {
            return Ok(None);
        }
        let mut r = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.base)
            .map_err(|source| StoreError::Csv {
                path: self.base.clone(),
                source,
            })?;
        match r.records().next() {
            Some(Ok(rec)) => Ok(Some(rec.iter().map(String::from).collect())),
            Some(Err(source)) => Err(StoreError::Csv {
                path: self.base.clone(),
                source,
            }),
            None => Ok(None),
        }
    }

    /// Rows of both files, base first. Missing or unreadable files are
    /// skipped; rows without a participant and a session are dropped.
    pub fn read_all_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for path in [&self.base, &self.ext] {
            if !path.is_file() {
                warn!(path = %path.display(), "dataset not found");
                continue;
            }
            if let Err(e) = read_rows(path, &mut rows, true) {
                warn!(error = %e, "skipping unreadable dataset");
            }
        }
        rows
    }

    /// Sorted unique participants.
    pub fn participants(&self) -> Vec<String> {
        self.read_all_rows()
            .into_iter()
            .filter_map(|mut r| r.remove("participant"))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted unique sessions of `participant`. Non-integer sessions are
    /// skipped.
    pub fn sessions(&self, participant: &str) -> Vec<i64> {
        let mut sessions = BTreeSet::new();
        for row in self.read_all_rows() {
            if row.get("participant").map(String::as_str) != Some(participant) {
                continue;
            }
            let raw = row.get("session").map(String::as_str).unwrap_or_default();
            match raw.parse::<i64>() {
                Ok(s) => {
                    sessions.insert(s);
                }
                Err(_) => warn!(participant, session = raw, "invalid session"),
            }
        }
        sessions.into_iter().collect()
    }

    pub fn history(&self, participant: &str, session: i64) -> Vec<Row> {
        self.read_all_rows()
            .into_iter()
            .filter(|r| {
                r.get("participant").map(String::as_str) == Some(participant)
                    && r.get("session").and_then(|s| s.parse::<i64>().ok()) == Some(session)
            })
            .collect()
    }

    /// Participants of the base dataset in first-appearance order. Class
    /// index `i` of the model is the i-th entry.
    pub fn class_labels(&self) -> Vec<String> {
        match read_dataset(&self.base) {
            Ok(rows) => participants_in_order(&rows),
            Err(e) => {
                warn!(error = %e, "no class labels");
                Vec::new()
            }
        }
    }

    /// Appends one row per digraph to the extension file. Appends are
    /// serialized across threads.
    pub fn append(
        &self,
        participant: &str,
        session: i64,
        digraphs: &[Digraph],
    ) -> Result<usize, StoreError> {
        let _guard = self.append_lock.lock();

        let non_empty = fs::metadata(&self.ext).map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            return Err(StoreError::NoHeader(self.ext.clone()));
        }
        let file = OpenOptions::new()
            .append(true)
            .open(&self.ext)
            .map_err(|source| StoreError::Io {
                path: self.ext.clone(),
                source,
            })?;

        let csv_err = |source| StoreError::Csv {
            path: self.ext.clone(),
            source,
        };
        let mut w = csv::Writer::from_writer(file);
        let session = session.to_string();
        for d in digraphs {
            let mut record = vec![
                participant.to_string(),
                session.clone(),
                d.key1.clone(),
                d.key2.clone(),
            ];
            record.extend(d.features.iter().map(f64::to_string));
            w.write_record(&record).map_err(csv_err)?;
        }
        w.flush().map_err(|source| StoreError::Io {
            path: self.ext.clone(),
            source,
        })?;

        debug!(path = %self.ext.display(), rows = digraphs.len(), "appended");
        Ok(digraphs.len())
    }
}

/// Reads one dataset file, dropping rows without a participant and a
/// session.
pub fn read_dataset(path: &Path) -> Result<Vec<Row>, StoreError> {
    let mut rows = Vec::new();
    read_rows(path, &mut rows, true)?;
    Ok(rows)
}

/// Reads one dataset file keeping every well-formed row in file order.
pub fn read_records(path: &Path) -> Result<Vec<Row>, StoreError> {
    let mut rows = Vec::new();
    read_rows(path, &mut rows, false)?;
    Ok(rows)
}

/// Distinct non-empty participants in first-appearance order.
pub fn participants_in_order(rows: &[Row]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for p in rows
        .iter()
        .filter_map(|r| r.get("participant"))
        .filter(|p| !p.is_empty())
    {
        if !seen.contains(p) {
            seen.push(p.clone());
        }
    }
    seen
}

fn read_rows(path: &Path, rows: &mut Vec<Row>, complete_only: bool) -> Result<(), StoreError> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut r = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = r.headers().map_err(csv_err)?.clone();

    for record in r.records() {
        let record = match record {
            Ok(rec) => rec,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping malformed row");
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let complete = !complete_only
            || ["participant", "session"]
                .iter()
                .all(|k| row.get(*k).is_some_and(|v| !v.is_empty()));
        if complete {
            rows.push(row);
        } else {
            debug!(path = %path.display(), "skipping incomplete row");
        }
    }
    Ok(())
}
