//! Unified error types for sitescore.

use std::path::PathBuf;

/// Unified error types for the sitescore cache and runner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading, writing, or removing a cache file failed.
    #[error("CACHE_IO: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache file exists but could not be decoded.
    #[error("CACHE_DECODE: {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded to JSON.
    #[error("CACHE_ENCODE: {0}")]
    Encode(#[source] serde_json::Error),

    /// The sitemap file could not be read for hashing.
    #[error("SITEMAP_READ: failed to open sitemap {}: {source}", path.display())]
    SitemapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation was called with a configuration it cannot honor.
    #[error("INVALID_CONFIG: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Decode { path: path.into(), source }
    }

    /// True when the error only says that a file was absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io { source, .. } | Error::SitemapRead { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("TTL must be positive".to_string());
        assert!(err.to_string().contains("INVALID_CONFIG"));
        assert!(err.to_string().contains("TTL must be positive"));
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io("/tmp/cache/urls/url-abc.json", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.starts_with("CACHE_IO"));
        assert!(msg.contains("url-abc.json"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_is_not_found() {
        let missing = Error::io("x.json", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(missing.is_not_found());

        let denied = Error::io("x.json", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!denied.is_not_found());

        assert!(!Error::InvalidConfig("nope".into()).is_not_found());
    }
}
