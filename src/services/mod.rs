//! Core services implementing the ingestion pipeline.
//!
//! - `blockchain`: chain client over the node's HTTP endpoints
//! - `cache`: ttl-cached data sources with stale fallback
//! - `churn`: node set diffing and the scheduled node list poll
//! - `decoder`: raw block to typed transaction and event decoding
//! - `dedup`: bloom filter backed transaction deduplication
//! - `limiter`: rate limiting and cooldown gates
//! - `pipeline`: ordered fan-out between stages
//! - `scanner`: block polling loop
//! - `smoothing`: majority vote over recent observations
//! - `store`: shared key-value store

pub mod blockchain;
pub mod cache;
pub mod churn;
pub mod decoder;
pub mod dedup;
pub mod limiter;
pub mod pipeline;
pub mod scanner;
pub mod smoothing;
pub mod store;
