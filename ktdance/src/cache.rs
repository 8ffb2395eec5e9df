use crate::Error;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Decoded assets keyed by canonical file path.
///
/// Asset files are treated as immutable for the life of the process, so entries are
/// never invalidated. Repeated frame queries against the same file decode it once.
#[derive(Debug)]
pub struct DecodeCache<T> {
    entries: Mutex<HashMap<PathBuf, Arc<T>>>,
}

impl<T> Default for DecodeCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> DecodeCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        std::fs::canonicalize(path)
            .map(|key| self.lock().contains_key(&key))
            .unwrap_or(false)
    }

    /// Returns the cached value for `path`, reading and decoding the file on first use.
    ///
    /// The lock is not held while decoding; if two callers race on the same path the
    /// first stored result wins.
    pub fn get_or_decode(
        &self,
        path: &Path,
        decode: impl FnOnce(&[u8]) -> Result<T, Error>,
    ) -> Result<Arc<T>, Error> {
        let key = std::fs::canonicalize(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }

        let bytes = std::fs::read(&key).map_err(|source| Error::Io {
            path: key.clone(),
            source,
        })?;
        log::debug!("decoding {} ({} bytes)", key.display(), bytes.len());
        let value = Arc::new(decode(&bytes)?);

        Ok(self.lock().entry(key).or_insert(value).clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
