//! Content-addressed cache key generation.
//!
//! Sitemap digests bind an index file to the exact content of a sitemap.
//! URL digests bind an entry file to one URL, independent of which sitemap
//! listed it, so the same page shared by two sitemaps has one entry.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::Error;

const READ_CHUNK: usize = 64 * 1024;

/// Where a set of URLs came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapSource {
    /// A local sitemap file; its raw bytes are hashed.
    File(PathBuf),
    /// A remote sitemap URL; the URL list it produced is hashed.
    Remote(String),
    /// An ad-hoc URL list with no sitemap behind it.
    UrlList,
}

impl SitemapSource {
    /// Classify user input: empty is an ad-hoc list, http(s) is remote, anything else a file path.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            SitemapSource::UrlList
        } else if input.starts_with("http://") || input.starts_with("https://") {
            SitemapSource::Remote(input.to_string())
        } else {
            SitemapSource::File(PathBuf::from(input))
        }
    }

    /// Human-readable identity stored alongside cached data.
    pub fn label(&self) -> String {
        match self {
            SitemapSource::File(path) => path.display().to_string(),
            SitemapSource::Remote(url) => url.clone(),
            SitemapSource::UrlList => "url list".to_string(),
        }
    }
}

/// Compute the sitemap digest for `source`.
///
/// File sources hash the file bytes and ignore `urls`. Other sources hash the
/// newline-joined `urls` in the order given.
pub async fn sitemap_digest(source: &SitemapSource, urls: &[String]) -> Result<String, Error> {
    match source {
        SitemapSource::File(path) => hash_file(path).await,
        SitemapSource::Remote(_) | SitemapSource::UrlList => Ok(hash_url_list(urls)),
    }
}

/// Hash the newline-joined URL list, preserving order.
pub fn hash_url_list(urls: &[String]) -> String {
    let mut hasher = Sha256::new();
    for (i, url) in urls.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(url.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Stable file name component for one URL.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

async fn hash_file(path: &Path) -> Result<String, Error> {
    let read_err = |source| Error::SitemapRead { path: path.to_path_buf(), source };

    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await.map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
