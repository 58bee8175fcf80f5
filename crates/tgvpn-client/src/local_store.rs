//! Small persisted key/value store for client-side preferences.
//!
//! Entries live in a single JSON file. Each may carry an absolute expiry in
//! unix seconds; expired entries read as missing and are dropped on access.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use time::OffsetDateTime;

/// Selected client platform, no expiry.
pub const PLATFORM_KEY: &str = "selected_platform";
/// Price of the tariff picked on the purchase screen.
pub const TARIFF_PRICE_KEY: &str = "tariff_price";
pub const TARIFF_PRICE_TTL: Duration = Duration::from_secs(60 * 60);
/// Last known subscription, shown while the status request is in flight.
pub const SUBSCRIPTION_KEY: &str = "subscription";
pub const SUBSCRIPTION_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid store contents: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl StoredEntry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredEntry>,
}

impl LocalStore {
    /// Load the store at `path`. A missing or corrupt file is an empty
    /// store; the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "discarding corrupt local store"
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.get_at(key, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn get_at<T: DeserializeOwned>(&mut self, key: &str, now: i64) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            self.entries.remove(key);
            if let Err(e) = self.save() {
                tracing::warn!(key = %key, error = %e, "failed to persist expired entry removal");
            }
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Store `value`, optionally expiring after `ttl`, and persist.
    pub fn set<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.set_at(key, value, ttl, now)
    }

    fn set_at<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        now: i64,
    ) -> Result<(), StoreError> {
        let entry = StoredEntry {
            value: serde_json::to_value(value)?,
            expires_at: ttl.map(|ttl| now.saturating_add(ttl.as_secs() as i64)),
        };
        self.entries.insert(key.to_string(), entry);
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.save()
    }

    /// Write through a temporary file in the same directory, then rename
    /// over the target.
    fn save(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err(dir))?;

        let contents = serde_json::to_vec_pretty(&self.entries)?;
        let mut file = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
        file.write_all(&contents).map_err(io_err(&self.path))?;
        file.persist(&self.path)
            .map_err(|e| io_err(&self.path)(e.error))?;
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Subscription, SubscriptionStatus};
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(PLATFORM_KEY, &"android", None).unwrap();

        let mut reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get::<String>(PLATFORM_KEY).as_deref(), Some("android"));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let mut store = LocalStore::open(&path).unwrap();

        store
            .set_at(TARIFF_PRICE_KEY, &199.0, Some(TARIFF_PRICE_TTL), 1_000)
            .unwrap();
        assert_eq!(store.get_at::<f64>(TARIFF_PRICE_KEY, 1_000 + 3_599), Some(199.0));
        assert_eq!(store.get_at::<f64>(TARIFF_PRICE_KEY, 1_000 + 3_600), None);

        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.entries.is_empty());
    }

    #[test]
    fn subscription_snapshot_roundtrips() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("s.json")).unwrap();
        let snapshot = Subscription {
            status: SubscriptionStatus::Active,
            expires_at: Some("2030-01-01T00:00:00Z".to_string()),
        };
        store
            .set(SUBSCRIPTION_KEY, &snapshot, Some(SUBSCRIPTION_TTL))
            .unwrap();
        assert_eq!(store.get::<Subscription>(SUBSCRIPTION_KEY), Some(snapshot));
        assert!(store.remove(SUBSCRIPTION_KEY).unwrap());
        assert!(!store.remove(SUBSCRIPTION_KEY).unwrap());
    }

    #[test]
    fn corrupt_file_opens_empty_and_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get::<String>(PLATFORM_KEY), None);

        store.set(PLATFORM_KEY, &"linux", None).unwrap();
        let mut reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get::<String>(PLATFORM_KEY).as_deref(), Some("linux"));
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        store.set(PLATFORM_KEY, &"ios", None).unwrap();
        store.set(TARIFF_PRICE_KEY, &199.0, Some(TARIFF_PRICE_TTL)).unwrap();

        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    }
}
