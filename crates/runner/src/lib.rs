//! Batch scoring for sitescore.
//!
//! This crate provides the bounded-concurrency batch runner that scores
//! URLs through a [`ScoreFetcher`], and the pipeline that combines it with
//! the URL cache from `sitescore-core`.

pub mod batch;
pub mod combine;
pub mod fetch;
pub mod pipeline;

pub use batch::{BatchRunner, Progress};
pub use combine::{combine_results, order_like};
pub use fetch::ScoreFetcher;
pub use pipeline::{Analysis, analyze};
