//! Cached data sources.
//!
//! [`CachedDataSource`] memoizes an async loader for a ttl, collapses concurrent refreshes
//! into a single load and keeps serving the last good value when a refresh fails.
//! [`LastBlockCached`] and [`NodeListCached`] are the chain-backed sources used by the
//! scanner and the churn detector.

mod chain;
mod error;
mod source;

pub use chain::{LastBlockCached, LatestHeightLoader, NodeListCached, NodeListLoader};
pub use error::CacheError;
pub use source::{CachePolicy, Cached, CachedDataSource, DataLoader};
