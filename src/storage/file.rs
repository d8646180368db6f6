//! File-backed token storage.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{SecurityError, SecurityResult};
use crate::storage::SecureStorage;

/// Store that keeps a JSON snapshot on disk and rewrites it on every change.
///
/// The file holds plain JSON; encrypting it at rest is left to the platform
/// (file permissions, encrypted home directories).
#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<DashMap<String, String>>,
    path: PathBuf,
}

impl FileStorage {
    /// Open `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> SecurityResult<Self> {
        let path = path.as_ref().to_path_buf();
        let storage = Self {
            inner: Arc::new(DashMap::new()),
            path,
        };

        if storage.path.exists() {
            let file = File::open(&storage.path).map_err(storage_err)?;
            let map: HashMap<String, String> =
                serde_json::from_reader(BufReader::new(file)).map_err(storage_err)?;
            for (k, v) in map {
                storage.inner.insert(k, v);
            }
            tracing::debug!(
                path = %storage.path.display(),
                entries = storage.inner.len(),
                "Loaded secure storage"
            );
        }
        Ok(storage)
    }

    fn save(&self) -> SecurityResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }
        let map: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let file = File::create(&self.path).map_err(storage_err)?;
        serde_json::to_writer(BufWriter::new(file), &map).map_err(storage_err)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_err(e: impl std::fmt::Display) -> SecurityError {
    SecurityError::Storage(e.to_string())
}

impl SecureStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> SecurityResult<()> {
        self.inner.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove_item(&self, key: &str) -> SecurityResult<()> {
        if self.inner.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AuthTokens;

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let storage = FileStorage::open(&path).unwrap();
        let tokens = AuthTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: 900,
        };
        storage.set_auth_tokens(&tokens).unwrap();

        // Load new instance
        let loaded = FileStorage::open(&path).unwrap();
        assert_eq!(loaded.get_auth_tokens(), Some(tokens));

        loaded.clear_auth_tokens().unwrap();
        let reloaded = FileStorage::open(&path).unwrap();
        assert!(reloaded.get_auth_tokens().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(SecurityError::Storage(_))));
    }
}
