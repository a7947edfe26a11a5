use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;

/// JSON documents on disk, one file per `{key}_{kind}.json`.
///
/// Entries are never updated in place: a changed input hashes to a new key.
/// Writes go through a temp file in the same directory and are renamed over
/// the target, so concurrent readers never see a partial document.
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &str, kind: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", key, escape_kind(kind)))
    }

    /// Look up an entry. Missing, unreadable, and unparseable files are all misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str, kind: &str) -> Option<T> {
        let path = self.entry_path(key, kind);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache miss: {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => {
                info!("Loaded cached result from {}", path.display());
                Some(value)
            }
            Err(e) => {
                warn!("Ignoring corrupted cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store an entry, creating the cache directory if needed.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, kind: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.entry_path(key, kind);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, value)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!("Saved result to cache: {}", path.display());
        Ok(path)
    }
}

/// Model identifiers such as `models/gemini-flash-latest` contain separators.
/// Filename-safe form of `kind`. ASCII alphanumerics, `-` and `.` pass
/// through; every other byte becomes `_XX` (uppercase hex), so distinct
/// kinds always map to distinct names.
fn escape_kind(kind: &str) -> String {
    let mut escaped = String::with_capacity(kind.len());
    for byte in kind.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("_{:02X}", byte));
        }
    }
    escaped
}
