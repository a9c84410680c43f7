//! JSON-file store under the local data directory.
//!
//! The whole map is rewritten on every change through a uniquely named temp
//! file persisted over the store, so a crash or a concurrent writer leaves
//! either the old or the new file on disk.
//!
//! A store that no longer parses is reported by reads but rebuilt by writes:
//! `set` and `remove` start over from an empty map, which keeps `clear_pin`
//! and a fresh setup usable as the reset path.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use super::{KeyValueStore, StoreError};

/// File name of the store inside the data directory.
pub const STORE_FILE_NAME: &str = "device-store.json";

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (lazily) a store at `path`. The parent directory is created now;
    /// the file itself only on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path,
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        restrict_permissions(tmp.as_file())?;
        tmp.as_file_mut().write_all(&serde_json::to_vec_pretty(map)?)?;
        tmp.as_file().sync_all()?;

        // Atomic rename onto the store path.
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StoreError::Corrupt(e)) => {
                log::warn!(
                    "Store file {} is corrupt, rebuilding it empty: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        f(&mut map);
        self.write_map(&map)
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|map| {
            map.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested").join(STORE_FILE_NAME)).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get("pin_hash_x").unwrap(), None);
        assert!(store.remove("pin_hash_x").is_ok());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let (dir, store) = temp_store();
        store.set("pin_hash_x", "sealed").unwrap();
        store.set("other", "value").unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path().join("nested").join(STORE_FILE_NAME)).unwrap();
        assert_eq!(reopened.get("pin_hash_x").unwrap().as_deref(), Some("sealed"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn test_remove_keeps_other_keys() {
        let (_dir, store) = temp_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), b"{not json").unwrap();
        assert!(matches!(store.get("a"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_writes_rebuild_corrupt_file() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), b"{trunc").unwrap();
        assert!(store.remove("pin_hash_x").is_ok());
        assert_eq!(store.get("pin_hash_x").unwrap(), None);

        fs::write(store.path(), b"{trunc").unwrap();
        store.set("pin_hash_x", "sealed").unwrap();
        assert_eq!(store.get("pin_hash_x").unwrap().as_deref(), Some("sealed"));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (dir, store) = temp_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(STORE_FILE_NAME)]);
    }

    #[test]
    fn test_two_handles_on_one_file() {
        let (dir, first) = temp_store();
        let second = FileStore::open(dir.path().join("nested").join(STORE_FILE_NAME)).unwrap();

        let t1 = std::thread::spawn(move || {
            for i in 0..20 {
                first.set("pin_hash_x", &format!("first-{}", i)).unwrap();
            }
        });
        let t2 = std::thread::spawn(move || {
            for i in 0..20 {
                second.set("pin_hash_x", &format!("second-{}", i)).unwrap();
            }
        });
        t1.join().unwrap();
        t2.join().unwrap();

        // Last write wins, and the file always parses.
        let reopened = FileStore::open(dir.path().join("nested").join(STORE_FILE_NAME)).unwrap();
        let value = reopened.get("pin_hash_x").unwrap().unwrap();
        assert!(value == "first-19" || value == "second-19", "{}", value);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        store.set("a", "1").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
