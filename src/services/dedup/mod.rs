//! Approximate deduplication.
//!
//! [`BloomFilter`] keeps a fixed-size bit array in the shared store; [`TxDeduplicator`]
//! namespaces one filter per consumer and tracks how often it is hit. [`DedupStage`] puts a
//! deduplicator between two pipelines.

mod bloom;
mod deduplicator;
mod stage;

pub use bloom::{bit_offsets, BloomFilter, BloomParams};
pub use deduplicator::{DedupStats, TxDeduplicator};
pub use stage::DedupStage;
