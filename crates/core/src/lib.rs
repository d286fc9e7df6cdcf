//! Core types and shared functionality for sitescore.
//!
//! This crate provides:
//! - Score and page result types shared by the runner and the cache
//! - The file-backed, content-addressed URL cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod types;

pub use cache::{CacheCoordinator, CacheEntry, CachedPage, Freshness, LookupOutcome, SitemapIndex, SitemapSource, Ttl};
pub use config::AppConfig;
pub use error::Error;
pub use types::{CategoryScores, Metrics, PageResult, ScoreResult, Strategy};
