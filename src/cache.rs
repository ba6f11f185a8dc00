use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::BusId;
use crate::error::CacheError;

/// How long a discovered bus is trusted before a full scan is forced again.
pub const CACHE_FRESHNESS: Duration = Duration::from_secs(24 * 60 * 60);

/// The last bus the gauge was discovered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub bus_id: BusId,
    pub written_at: DateTime<Utc>,
}

/// A durable slot holding at most one [`CacheRecord`]. Last writer wins.
pub trait CacheStore {
    fn read(&self) -> Result<Option<CacheRecord>, CacheError>;
    fn write(&self, record: &CacheRecord) -> Result<(), CacheError>;
}

/// Keeps the record as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CacheStore for FileStore {
    fn read(&self) -> Result<Option<CacheRecord>, CacheError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn write(&self, record: &CacheRecord) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|err| self.io_error(err))?;
        }
        let data = serde_json::to_string(record).map_err(|source| CacheError::Encode {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(|err| self.io_error(err))
    }
}

/// Freshness policy over a [`CacheStore`]. Store failures are logged and
/// otherwise ignored: a broken cache behaves like an empty one.
pub struct BindingCache<S> {
    store: S,
    freshness: Duration,
}

impl<S: CacheStore> BindingCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_freshness(store, CACHE_FRESHNESS)
    }

    pub fn with_freshness(store: S, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn store_ref(&self) -> &S {
        &self.store
    }

    /// The cached bus and its age, or `None` if absent, unreadable or stale.
    pub fn load(&self) -> Option<(BusId, Duration)> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Option<(BusId, Duration)> {
        let record = match self.store.read() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("ignoring bus cache: {err}");
                return None;
            }
        };

        // A negative age means the clock moved backwards; don't trust it.
        let Ok(age) = (now - record.written_at).to_std() else {
            log::debug!("cached bus {} written in the future, treating as stale", record.bus_id);
            return None;
        };
        if age > self.freshness {
            log::debug!("cached bus {} is stale ({}s old)", record.bus_id, age.as_secs());
            return None;
        }

        Some((record.bus_id, age))
    }

    pub fn store(&self, bus_id: BusId) {
        self.store_at(bus_id, Utc::now())
    }

    pub fn store_at(&self, bus_id: BusId, now: DateTime<Utc>) {
        let record = CacheRecord {
            bus_id,
            written_at: now,
        };
        if let Err(err) = self.store.write(&record) {
            log::warn!("could not remember bus {bus_id}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bus: u32, written_at: DateTime<Utc>) -> CacheRecord {
        CacheRecord {
            bus_id: BusId(bus),
            written_at,
        }
    }

    #[test]
    fn test_load_empty() {
        let cache = BindingCache::new(crate::testing::MemoryStore::default());
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_freshness_boundary() {
        let written = Utc::now();
        let cache = BindingCache::new(crate::testing::MemoryStore::holding(record(11, written)));
        let window = chrono::Duration::hours(24);
        let epsilon = chrono::Duration::seconds(1);

        let (bus, age) = cache.load_at(written + window - epsilon).unwrap();
        assert_eq!(bus, BusId(11));
        assert_eq!(age, CACHE_FRESHNESS - Duration::from_secs(1));

        assert_eq!(cache.load_at(written + window + epsilon), None);
    }

    #[test]
    fn test_future_record_is_stale() {
        let now = Utc::now();
        let cache = BindingCache::new(crate::testing::MemoryStore::holding(record(
            4,
            now + chrono::Duration::minutes(5),
        )));
        assert_eq!(cache.load_at(now), None);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = BindingCache::new(crate::testing::MemoryStore::holding(record(11, Utc::now())));
        cache.store(BusId(13));
        assert_eq!(cache.load().map(|(bus, _)| bus), Some(BusId(13)));
        assert_eq!(cache.store_ref().writes.get(), 1);
    }

    #[test]
    fn test_store_errors_are_swallowed() {
        let cache = BindingCache::new(crate::testing::MemoryStore::failing());
        cache.store(BusId(3));
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("bus.json"));
        assert_eq!(store.read().unwrap(), None);

        let written = record(13, Utc::now());
        store.write(&written).unwrap();
        assert_eq!(store.read().unwrap(), Some(written));
    }

    #[test]
    fn test_encode_error_does_not_blame_the_file() {
        let source = serde_json::from_str::<CacheRecord>("{").unwrap_err();
        let err = CacheError::Encode {
            path: PathBuf::from("/tmp/bus.json"),
            source,
        };
        let message = err.to_string();
        assert!(message.starts_with("cannot encode cache record for /tmp/bus.json"));
        assert!(!message.contains("corrupt"));
    }

    #[test]
    fn test_file_store_corrupt_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bus.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.read(), Err(CacheError::Corrupt { .. })));
        assert_eq!(BindingCache::new(store).load(), None);
    }
}
