//! Test helper utilities
//!
//! This module contains test helper utilities for the application.
//!
//! - `builders`: Test helper utilities for creating test instances of models
//! - `http`: Test helper utilities for creating HTTP clients

pub mod builders {
	pub mod block;
	pub mod network;
	pub mod node;
}


pub use builders::*;
pub use http::*;
