//! Persistent storage for the bearer token.
//!
//! The token lives under the fixed key `access_token`. There is no expiry or
//! refresh logic here; a stale token is only noticed when the backend
//! rejects it.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const TOKEN_KEY: &str = "access_token";

/// Where the bearer token is kept between runs.
///
/// Reads are synchronous so the session state can be derived before any
/// I/O is awaited.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// JSON key/value file, cached in memory and written through on change.
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<Option<String>>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = match Self::read_file(&path) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            cache: RwLock::new(token),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> io::Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(entries.get(TOKEN_KEY).filter(|t| !t.is_empty()).cloned())
    }

    fn write_file(&self, token: Option<&str>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entries = HashMap::new();
        if let Some(token) = token {
            entries.insert(TOKEN_KEY, token);
        }
        let content = serde_json::to_string_pretty(&entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.cache.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> io::Result<()> {
        self.write_file(Some(token))?;
        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if let Ok(mut cache) = self.cache.write() {
            *cache = None;
        }
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Process-local store that forgets the token on exit.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> io::Result<()> {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_persists_under_fixed_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::open(&path);
        assert_eq!(store.get(), None);
        store.set("abc.def.ghi").unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[TOKEN_KEY], "abc.def.ghi");

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.get().as_deref(), Some("abc.def.ghi"));

        reopened.clear().unwrap();
        assert_eq!(reopened.get(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::open(&path);
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("t1");
        assert_eq!(store.get().as_deref(), Some("t1"));
        store.clear().unwrap();
        assert_eq!(store.get(), None);
    }
}
