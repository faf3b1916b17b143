//! Node-set churn detection.
//!
//! - [`diff`]: pure comparison of two node snapshots
//! - [`NodeChurnDetector`]: pipeline stage keeping the previous snapshot in the store
//! - [`NodeListJob`]: cron job feeding node lists into the detector's input pipeline

mod detector;
mod diff;
mod error;
mod job;

pub use detector::NodeChurnDetector;
pub use diff::diff;
pub use error::ChurnError;
pub use job::{poll_node_list, JobSchedulerTrait, NodeListJob};
