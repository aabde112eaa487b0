//! Persisted key-value state: cached schedules and saved addresses.
//!
//! Values are plain strings. [`FileStore`] keeps everything in a single
//! JSON object on disk and rewrites it on every `set`.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use ecosort_core::{DischargeSchedule, LocationDescriptor};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// String-to-string storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }
}

const DISTRICT_SUFFIXES: &[&str] = &["구", "시", "군"];

/// Last known schedule per region, for when the rule lookup comes back empty.
pub struct ScheduleCache<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> ScheduleCache<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Store key under the official province name ("서울" and "서울특별시"
    /// share one entry).
    pub fn key(sido: &str, sigungu: &str) -> String {
        let region = LocationDescriptor::from_parts(sido, sigungu);
        format!("schedule:{}:{}", region.sido, region.sigungu)
    }

    /// Keys tried on load: as given, then with a district suffix when the
    /// caller left it off ("종로" finds "종로구").
    fn candidate_keys(sido: &str, sigungu: &str) -> Vec<String> {
        let mut keys = vec![Self::key(sido, sigungu)];
        let sigungu = sigungu.trim();
        if !sigungu.is_empty() && !DISTRICT_SUFFIXES.iter().any(|s| sigungu.ends_with(s)) {
            keys.extend(
                DISTRICT_SUFFIXES
                    .iter()
                    .map(|suffix| Self::key(sido, &format!("{}{}", sigungu, suffix))),
            );
        }
        keys
    }

    pub fn load(&self, sido: &str, sigungu: &str) -> Option<DischargeSchedule> {
        let raw = Self::candidate_keys(sido, sigungu)
            .iter()
            .find_map(|key| self.store.get(key))?;
        match serde_json::from_str(&raw) {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                tracing::warn!(sido, sigungu, error = %e, "Ignoring unreadable cached schedule");
                None
            }
        }
    }

    pub fn save(
        &self,
        sido: &str,
        sigungu: &str,
        schedule: &DischargeSchedule,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(schedule)?;
        self.store.set(&Self::key(sido, sigungu), &json)
    }
}

/// Saved address slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSlot {
    Home,
    Work,
}

impl AddressSlot {
    pub fn key(&self) -> &'static str {
        match self {
            AddressSlot::Home => "address:home",
            AddressSlot::Work => "address:work",
        }
    }
}

impl FromStr for AddressSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(AddressSlot::Home),
            "work" => Ok(AddressSlot::Work),
            other => Err(format!("unknown address slot '{}' (expected home or work)", other)),
        }
    }
}
