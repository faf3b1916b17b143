//! Mock implementations for testing purposes.
//!
//! This module contains mock implementations of various traits used throughout
//! the application, primarily for testing. It includes mocks for:
//! - The chain client
//! - Pipeline subscribers and the job scheduler
//! - Rotating transports
//!
//! The mocks are implemented using the `mockall` crate.

mod clients;
mod services;
mod transports;
#[allow(unused_imports)]
pub use clients::*;
#[allow(unused_imports)]
pub use services::*;
#[allow(unused_imports)]
pub use transports::*;
