//! THORChain block ingestion service.
//!
//! Scans the chain block by block, decodes native transactions and events, and fans them
//! out to subscribers through ordered pipelines. Shared state (scanner cursor,
//! deduplication bits, cooldowns, rate limits) lives in a key-value store so several
//! processes can cooperate.
//!
//! # Module Structure
//!
//! - `bootstrap`: Wires the services together
//! - `models`: Chain data and configuration
//! - `services`: Scanner, decoder, pipelines and their supporting gates
//! - `utils`: Logging, metrics, HTTP and test helpers

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
