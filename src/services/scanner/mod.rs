//! Block scanning service.
//!
//! [`BlockScanner`] walks the chain height by height, decodes each block and hands it to the
//! block pipeline. Progress is persisted through [`ScannerStateStore`] so a restart resumes
//! where the previous run stopped.

mod error;
mod service;
mod state;

pub use error::ScannerServiceError;
pub use service::{BlockScanner, TickOutcome, TickReport};
pub use state::{ScannerState, ScannerStateStore};
