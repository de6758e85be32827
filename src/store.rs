use crate::datekey::DateKey;
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::collections::HashMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use thiserror::Error;
#[cfg(test)]
use time::Date;

/// File holding per-day event data and the next-event headline
pub(crate) const EVENTS_FILE: &str = "CalendarWidgetPrefs.json";

/// File holding the sync handshake flags between the app and the widget
pub(crate) const SYNC_FILE: &str = "WidgetSyncPrefs.json";

pub(crate) const NEXT_EVENT_TITLE: &str = "nextEventTitle";
pub(crate) const NEEDS_SYNC: &str = "needsSync";
pub(crate) const LAST_SYNC_REQUEST: &str = "lastSyncRequest";

/// What the store knows about a single day.  An unknown day is simply
/// `EventRecord::default()`, i.e., no events and no title.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct EventRecord {
    pub(crate) has_events: bool,
    pub(crate) title: String,
}

/// Read-only source of per-day event data.  Lookups never fail; a key the
/// store has never heard of means "no events".
pub(crate) trait EventStore {
    fn lookup(&self, key: &DateKey) -> EventRecord;
}

impl<T: EventStore + ?Sized> EventStore for &T {
    fn lookup(&self, key: &DateKey) -> EventRecord {
        (**self).lookup(key)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum PrefValue {
    Bool(bool),
    Int(i64),
    Text(String),
    /// Floats, nulls, string sets, and anything else another writer left
    /// behind.  Kept as-is so that saving does not drop it.
    Other(serde_json::Value),
}

/// A flat string-keyed preference map persisted as a JSON object.  Both the
/// widget and the app that feeds it read and write these files.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Preferences(BTreeMap<String, PrefValue>);

impl Preferences {
    pub(crate) fn new() -> Preferences {
        Preferences::default()
    }

    /// Load preferences from `path`.  A file that does not exist yet is an
    /// empty store, not an error.
    pub(crate) fn load(path: &Path) -> Result<Preferences, StoreError> {
        let src = match fs::read_to_string(path) {
            Ok(src) => src,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist; using empty store", path.display());
                return Ok(Preferences::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if src.trim().is_empty() {
            return Ok(Preferences::new());
        }
        serde_json::from_str(&src).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the preferences to `path` by way of a uniquely named temporary
    /// file in the same directory, synced before it is moved into place, so
    /// that concurrent readers see either the old or the new contents.
    pub(crate) fn save(&self, path: &Path) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| StoreError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        log::debug!("saved {} preference(s) to {}", self.0.len(), path.display());
        Ok(())
    }

    pub(crate) fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(PrefValue::Bool(b)) => *b,
            _ => default,
        }
    }

    pub(crate) fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(PrefValue::Int(n)) => *n,
            _ => default,
        }
    }

    pub(crate) fn get_text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(PrefValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn set_bool(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_owned(), PrefValue::Bool(value));
    }

    pub(crate) fn set_int(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_owned(), PrefValue::Int(value));
    }

    pub(crate) fn set_text(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), PrefValue::Text(value.to_owned()));
    }
}

impl EventStore for Preferences {
    fn lookup(&self, key: &DateKey) -> EventRecord {
        let has_events = self.get_bool(&key.has_events_key(), false);
        // A title left behind under a cleared flag is stale
        let title = if has_events {
            self.get_text(&key.event_title_key())
                .unwrap_or_default()
                .to_owned()
        } else {
            String::new()
        };
        EventRecord { has_events, title }
    }
}

/// In-memory event store keyed directly by date
#[cfg(test)]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct MemoryStore(HashMap<DateKey, EventRecord>);

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub(crate) fn insert(&mut self, date: Date, has_events: bool, title: &str) {
        self.0.insert(
            DateKey::for_date(date),
            EventRecord {
                has_events,
                title: title.to_owned(),
            },
        );
    }
}

#[cfg(test)]
impl EventStore for MemoryStore {
    fn lookup(&self, key: &DateKey) -> EventRecord {
        self.0.get(key).cloned().unwrap_or_default()
    }
}

/// The directory containing the widget's two preference files
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct StoreDir {
    root: PathBuf,
}

impl StoreDir {
    pub(crate) fn new<P: Into<PathBuf>>(root: P) -> StoreDir {
        StoreDir { root: root.into() }
    }

    pub(crate) fn events_path(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub(crate) fn sync_path(&self) -> PathBuf {
        self.root.join(SYNC_FILE)
    }

    pub(crate) fn load_events(&self) -> Result<Preferences, StoreError> {
        Preferences::load(&self.events_path())
    }

    pub(crate) fn load_sync(&self) -> Result<Preferences, StoreError> {
        Preferences::load(&self.sync_path())
    }

    /// Modification times of the events file and the sync file, each `None`
    /// if the file is missing or the platform cannot report it
    pub(crate) fn modified(&self) -> [Option<SystemTime>; 2] {
        [self.events_path(), self.sync_path()].map(|path| {
            fs::metadata(path)
                .and_then(|md| md.modified())
                .ok()
        })
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("failed to read {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences for {}", .path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}
