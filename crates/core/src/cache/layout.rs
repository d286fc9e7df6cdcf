//! On-disk cache layout and JSON file primitives.
//!
//! ```text
//! <root>/
//!   indexes/sitemap-<sitemap digest>.json
//!   urls/url-<url digest>.json
//! ```
//!
//! Files are pretty-printed JSON, one object per file, replaced whole on
//! every save via write-to-temp then rename.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::hash::url_digest;
use crate::Error;

const INDEX_DIR: &str = "indexes";
const ENTRY_DIR: &str = "urls";
const INDEX_PREFIX: &str = "sitemap-";
const ENTRY_PREFIX: &str = "url-";
const EXTENSION: &str = ".json";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Paths inside one cache root.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.root.join(INDEX_DIR)
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.root.join(ENTRY_DIR)
    }

    pub fn index_path(&self, sitemap_hash: &str) -> PathBuf {
        self.indexes_dir().join(index_file_name(sitemap_hash))
    }

    pub fn entry_path(&self, file_name: &str) -> PathBuf {
        self.entries_dir().join(file_name)
    }
}

pub fn index_file_name(sitemap_hash: &str) -> String {
    format!("{INDEX_PREFIX}{sitemap_hash}{EXTENSION}")
}

/// Entry file name for `url`, as stored in index mappings.
pub fn entry_file_name(url: &str) -> String {
    format!("{ENTRY_PREFIX}{}{EXTENSION}", url_digest(url))
}

/// Sitemap digest encoded in an index file name.
pub fn sitemap_hash_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(INDEX_PREFIX)?
        .strip_suffix(EXTENSION)
        .filter(|hash| !hash.is_empty())
}

/// True for a bare `url-*.json` name with no path components.
pub fn is_entry_file_name(file_name: &str) -> bool {
    file_name.starts_with(ENTRY_PREFIX)
        && file_name.ends_with(EXTENSION)
        && file_name.len() > ENTRY_PREFIX.len() + EXTENSION.len()
        && !file_name.contains(['/', '\\'])
        && !file_name.contains("..")
}

/// Read and decode one JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let bytes = tokio::fs::read(path).await.map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::decode(path, e))
}

/// Encode `value` as pretty JSON and atomically replace `path` with it.
///
/// Returns the number of bytes written.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<u64, Error> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(Error::Encode)?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&temp_path, &bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(Error::io(&temp_path, e));
    }
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(Error::io(path, e));
    }

    Ok(bytes.len() as u64)
}

/// Remove a file. Returns false if it was already gone.
pub async fn remove_file(path: &Path) -> Result<bool, Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Names of `*.json` files directly inside `dir`. A missing directory is empty.
pub async fn list_json_files(dir: &Path) -> Result<Vec<String>, Error> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && name.ends_with(EXTENSION)
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}-{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}
