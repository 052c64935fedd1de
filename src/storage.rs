use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persisted blob names. Each blob lives under its own key so a corrupt
/// layout cannot take the events down with it.
pub const LAYOUT_KEY: &str = "dashboard-layout";
pub const EVENTS_KEY: &str = "dashboard_events_v1";
pub const MEMO_KEY: &str = "dashboard_memo_v1";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse stored JSON: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSON: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Fallible string-keyed storage. Every store in the dashboard persists
/// through this seam so a missing or broken backend degrades the session
/// instead of ending it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One file per key inside the state directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(StorageError::Io)?;
        fs::write(self.key_path(key), value).map_err(StorageError::Io)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

pub fn resolve_state_dir(cli_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = cli_dir {
        return dir;
    }

    if let Some(dir) = env::var_os("DESKDASH_STATE_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(dir) = env::var_os("LOCALAPPDATA") {
            return PathBuf::from(dir).join("deskdash");
        }
    }

    if let Some(dir) = env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(dir).join("deskdash");
    }

    if let Some(dir) = env::var_os("HOME") {
        return PathBuf::from(dir)
            .join(".local")
            .join("state")
            .join("deskdash");
    }

    PathBuf::from(".deskdash")
}

/// In-memory store for tests. `fail_writes` turns every write into an
/// unavailable-storage error so the degraded paths can be exercised.
#[cfg(test)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
    pub fail_writes: bool,
    pub writes: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: std::collections::HashMap::new(),
            fail_writes: false,
            writes: 0,
        }
    }

    pub fn seed(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::Other,
                "storage unavailable",
            )));
        }
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::Other,
                "storage unavailable",
            )));
        }
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{FileStore, KeyValueStore};

    #[test]
    fn file_store_round_trips_and_reads_missing_as_none() {
        let dir = temp_dir("deskdash_storage_roundtrip");
        let mut store = FileStore::new(dir.clone());

        assert!(store.get("missing").expect("read should succeed").is_none());

        store.set("blob", "{\"a\":1}").expect("write should succeed");
        assert_eq!(
            store.get("blob").expect("read should succeed").as_deref(),
            Some("{\"a\":1}")
        );

        store.remove("blob").expect("remove should succeed");
        assert!(store.get("blob").expect("read should succeed").is_none());
        store.remove("blob").expect("double remove should be fine");

        let _ = fs::remove_dir_all(dir);
    }

    fn temp_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("{}_{}", name, std::process::id()));
        dir
    }
}
