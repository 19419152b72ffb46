use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug)]
pub enum StorageError {
    QuotaExceeded { key: String, size: u64 },
    Io(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::QuotaExceeded { key, size } => {
                write!(f, "storage quota exceeded writing '{key}' ({size} bytes)")
            }
            StorageError::Io(err) => write!(f, "storage io error: {err}"),
        }
    }
}

/// The persistence contract: a synchronous string key-value store with a
/// finite capacity. Writes that would exceed the quota fail; callers decide
/// what to shed.
pub trait KeyValue: Send + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str);
}

/// In-memory store with the same quota discipline as [`DirStore`].
#[derive(Debug)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }
}

impl MemoryStore {
    pub fn new(quota: u64) -> Self {
        Self {
            entries: HashMap::new(),
            quota,
        }
    }

    fn used(&self) -> u64 {
        self.entries.values().map(|value| value.len() as u64).sum()
    }
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let existing = self.entries.get(key).map_or(0, |value| value.len() as u64);
        let size = value.len() as u64;
        if self.used() - existing + size > self.quota {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size,
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// File-backed store: one file per key under the data directory, with the
/// key encoded into the filename so arbitrary key strings stay on disk
/// safely. Sizes are tracked for quota accounting.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    quota: u64,
    sizes: HashMap<String, u64>,
}

impl DirStore {
    pub fn open(root: &Path, quota: u64) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root).map_err(StorageError::Io)?;
        let mut sizes = HashMap::new();
        for entry in std::fs::read_dir(root).map_err(StorageError::Io)? {
            let entry = entry.map_err(StorageError::Io)?;
            let Some(key) = key_from_file_name(&entry.file_name()) else {
                continue;
            };
            let metadata = entry.metadata().map_err(StorageError::Io)?;
            if metadata.is_file() {
                sizes.insert(key, metadata.len());
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            quota,
            sizes,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded = encode_config(key.as_bytes(), URL_SAFE_NO_PAD);
        self.root.join(format!("{encoded}.kv"))
    }

    fn used(&self) -> u64 {
        self.sizes.values().sum()
    }
}

impl KeyValue for DirStore {
    fn get(&self, key: &str) -> Option<String> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                eprintln!("failed to read stored entry '{key}': {err}");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let existing = self.sizes.get(key).copied().unwrap_or(0);
        let size = value.len() as u64;
        if self.used() - existing + size > self.quota {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size,
            });
        }
        write_atomic(&self.path_for(key), value).map_err(StorageError::Io)?;
        self.sizes.insert(key.to_string(), size);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => eprintln!("failed to remove stored entry '{key}': {err}"),
        }
        self.sizes.remove(key);
    }
}

fn key_from_file_name(name: &std::ffi::OsStr) -> Option<String> {
    let name = name.to_str()?;
    let stem = name.strip_suffix(".kv")?;
    let decoded = decode_config(stem, URL_SAFE_NO_PAD).ok()?;
    String::from_utf8(decoded).ok()
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry.kv");
    let temp_path = parent.join(format!(".{}.tmp-{}", file_name, std::process::id()));
    std::fs::write(&temp_path, contents)?;
    std::fs::rename(&temp_path, path)
}
