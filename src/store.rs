use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::record::ArticleRecord;

pub const DEFAULT_STORE_PATH: &str = "articles.json";

/// The shared article collection: one JSON array in one file.
///
/// The generator is the only writer. Appends are load, push, then an atomic
/// rewrite of the whole file.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    path: PathBuf,
}

impl ArticleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ArticleStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lenient load of the raw entries. A missing or unreadable collection is
    /// treated as empty; its old content is dropped by the next write.
    /// Entries are kept as JSON values so unknown keys survive an append.
    pub fn load_entries(&self) -> Vec<Value> {
        let raw = match self.read_raw() {
            Ok(raw) => raw,
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no collection yet, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "collection unreadable, starting fresh");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "collection is not a JSON array, starting fresh");
                Vec::new()
            }
        }
    }

    /// Lenient typed load. Entries that do not fit `ArticleRecord` are skipped.
    pub fn load(&self) -> Vec<ArticleRecord> {
        self.load_entries()
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(path = %self.path.display(), index = i, error = %e, "skipping entry");
                    None
                }
            })
            .collect()
    }

    /// Reader-side load: anything short of a valid article list is an error.
    pub fn load_strict(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let raw = self.read_raw()?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Append one record and return the new collection length.
    pub fn append(&self, record: &ArticleRecord) -> Result<usize, StoreError> {
        let mut entries = self.load_entries();
        entries.push(serde_json::to_value(record)?);
        let json = serde_json::to_string_pretty(&entries)?;
        atomic_write(&self.path, json.as_bytes()).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(entries.len())
    }

    fn read_raw(&self) -> Result<String, StoreError> {
        fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Write to a sibling temp file, fsync, then rename over the target.
/// The temp file is removed if any step fails.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let result = write_synced(&tmp, data).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(data)?;
    f.sync_all()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
