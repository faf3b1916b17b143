//! Utility modules shared across the application.
//!
//! - clock: wall-clock helpers
//! - cron_utils: cron schedule helpers
//! - http: retryable HTTP client construction
//! - logging: logging setup and error context
//! - metrics: Prometheus registry and metrics server
//! - parsing: command line value parsing
//! - tests: builders for tests

mod cron_utils;

pub mod clock;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod parsing;
pub mod tests;

pub use clock::now_ts;
pub use cron_utils::*;
pub use http::*;
pub use parsing::*;
