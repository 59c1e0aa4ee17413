//! Persistence port: opaque text records stored under a key.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

pub trait Storage {
    /// Returns `None` when nothing was ever saved under `key`.
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read a JSON record, falling back to `T::default()` when it is missing or
/// unreadable.
pub fn load_json<T, S>(storage: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: Storage + ?Sized,
{
    match storage.load(key) {
        Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring unreadable '{}' record: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Failed to read '{}' record: {}", key, e);
            T::default()
        }
    }
}

pub fn save_json<T, S>(storage: &mut S, key: &str, data: &T) -> Result<()>
where
    T: Serialize,
    S: Storage + ?Sized,
{
    storage.save(key, &serde_json::to_string_pretty(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: u32,
    }

    #[test]
    fn file_storage_round_trips_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested")).unwrap();

        assert_eq!(storage.load("history").unwrap(), None);
        storage.save("history", "{\"lastId\":0}").unwrap();
        assert_eq!(storage.load("history").unwrap().as_deref(), Some("{\"lastId\":0}"));
        assert!(storage.path_for("history").ends_with("nested/history.json"));
        assert!(!storage.path_for("history").with_extension("json.tmp").exists());
    }

    #[test]
    fn memory_storage_overwrites() {
        let mut storage = MemoryStorage::new();
        storage.save("k", "a").unwrap();
        storage.save("k", "b").unwrap();
        assert_eq!(storage.load("k").unwrap().as_deref(), Some("b"));
        assert_eq!(storage.load("other").unwrap(), None);
    }

    #[test]
    fn load_json_defaults_on_garbage() {
        let mut storage = MemoryStorage::new();
        storage.save("sample", "not json").unwrap();
        assert_eq!(load_json::<Sample, _>(&storage, "sample"), Sample::default());

        save_json(&mut storage, "sample", &Sample { count: 3 }).unwrap();
        assert_eq!(load_json::<Sample, _>(&storage, "sample"), Sample { count: 3 });
    }
}
