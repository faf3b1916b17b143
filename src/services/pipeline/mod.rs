//! Ordered fan-out between processing stages.
//!
//! A [`DelegatePipeline`] owns an ordered list of [`Subscriber`]s and hands every payload to
//! each of them in registration order. One subscriber failing is logged and does not stop
//! delivery to the others. Stages are chained by making a stage both a subscriber of the
//! previous pipeline and the owner of the next one.

mod error;
mod gate;

pub use error::PipelineError;
pub use gate::{FlagRecord, Flagship, PassageGate};

use async_trait::async_trait;
use std::{
	collections::HashMap,
	error::Error,
	sync::Arc,
	time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::{
	models::{BlockResult, NodeInfo, NodeSetChanges},
	utils::metrics::SUBSCRIBER_ERRORS,
};

/// Consumer of a pipeline.
#[async_trait]
pub trait Subscriber<T: Send + Sync>: Send + Sync {
	/// Name used for gating, logs and self-registration checks
	fn name(&self) -> String;

	/// Handles one payload from the pipeline named `sender`.
	async fn on_data(&self, sender: &str, data: &T) -> anyhow::Result<()>;

	/// Handles an error raised upstream. Ignored by default.
	async fn on_error(&self, _sender: &str, _error: &(dyn Error + Send + Sync)) -> anyhow::Result<()> {
		Ok(())
	}
}

/// Payloads that can be dispatched. Empty payloads are dropped before delivery.
pub trait Dispatchable: Send + Sync {
	fn is_empty_payload(&self) -> bool;
}

impl Dispatchable for BlockResult {
	fn is_empty_payload(&self) -> bool {
		false
	}
}

impl Dispatchable for NodeSetChanges {
	fn is_empty_payload(&self) -> bool {
		self.is_empty()
	}
}

impl<T: Send + Sync> Dispatchable for Vec<T> {
	fn is_empty_payload(&self) -> bool {
		self.is_empty()
	}
}

/// Node snapshots are dispatched as `Vec<NodeInfo>`.
pub type NodeSnapshot = Vec<NodeInfo>;

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSummary {
	/// Time spent in each subscriber that received the payload, in delivery order
	pub elapsed: Vec<(String, Duration)>,
	/// Subscribers that returned an error
	pub failed: Vec<String>,
	/// Subscribers skipped by the passage gate
	pub gated: Vec<String>,
}

impl DispatchSummary {
	pub fn delivered(&self) -> usize {
		self.elapsed.len()
	}

	pub fn elapsed_by_name(&self) -> HashMap<&str, Duration> {
		self.elapsed
			.iter()
			.map(|(name, elapsed)| (name.as_str(), *elapsed))
			.collect()
	}
}

/// Ordered list of subscribers for payloads of type `T`
pub struct DelegatePipeline<T: Send + Sync> {
	name: String,
	subscribers: RwLock<Vec<Arc<dyn Subscriber<T>>>>,
	gate: Option<Arc<dyn PassageGate>>,
}

fn same_subscriber<T: Send + Sync>(a: &Arc<dyn Subscriber<T>>, b: &Arc<dyn Subscriber<T>>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl<T: Dispatchable> DelegatePipeline<T> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			subscribers: RwLock::new(Vec::new()),
			gate: None,
		}
	}

	/// Adds a gate consulted before every delivery.
	pub fn with_gate(mut self, gate: Arc<dyn PassageGate>) -> Self {
		self.gate = Some(gate);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Registers a subscriber at the end of the delivery order.
	///
	/// Registering the same handle twice is a no-op.
	///
	/// # Returns
	/// `true` if the subscriber was added, `false` if it was already registered
	///
	/// # Errors
	/// Returns [`PipelineError::RegistrationError`] if the subscriber carries the pipeline's
	/// own name.
	pub async fn add_subscriber(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<bool, PipelineError> {
		if subscriber.name() == self.name {
			return Err(PipelineError::registration_error(
				"a pipeline cannot subscribe to itself",
				None,
				Some(HashMap::from([("pipeline".to_string(), self.name.clone())])),
			));
		}

		let mut subscribers = self.subscribers.write().await;
		if subscribers.iter().any(|s| same_subscriber(s, &subscriber)) {
			return Ok(false);
		}
		tracing::debug!(pipeline = %self.name, subscriber = %subscriber.name(), "Subscriber added");
		subscribers.push(subscriber);
		Ok(true)
	}

	/// Removes a subscriber; returns whether it was registered.
	pub async fn remove_subscriber(&self, subscriber: &Arc<dyn Subscriber<T>>) -> bool {
		let mut subscribers = self.subscribers.write().await;
		let before = subscribers.len();
		subscribers.retain(|s| !same_subscriber(s, subscriber));
		subscribers.len() != before
	}

	pub async fn subscriber_count(&self) -> usize {
		self.subscribers.read().await.len()
	}

	pub async fn subscriber_names(&self) -> Vec<String> {
		self.subscribers
			.read()
			.await
			.iter()
			.map(|s| s.name())
			.collect()
	}

	/// Delivers `data` to every subscriber in registration order.
	///
	/// # Returns
	/// `None` for an empty payload, otherwise the per-subscriber timings
	pub async fn dispatch(&self, data: &T) -> Option<DispatchSummary> {
		if data.is_empty_payload() {
			return None;
		}

		let subscribers = self.subscribers.read().await.clone();
		let mut summary = DispatchSummary::default();

		for subscriber in subscribers {
			let name = subscriber.name();
			if let Some(gate) = &self.gate {
				if !gate.can_pass(&self.name, &name).await {
					tracing::warn!(pipeline = %self.name, subscriber = %name, "Passage not allowed");
					summary.gated.push(name);
					continue;
				}
			}

			let started = Instant::now();
			if let Err(e) = subscriber.on_data(&self.name, data).await {
				tracing::error!(
					pipeline = %self.name,
					subscriber = %name,
					"Subscriber failed to handle data: {:#}",
					e
				);
				SUBSCRIBER_ERRORS.with_label_values(&[name.as_str()]).inc();
				summary.failed.push(name.clone());
			}
			summary.elapsed.push((name, started.elapsed()));
		}

		Some(summary)
	}

	/// Broadcasts an upstream error to every subscriber.
	pub async fn broadcast_error(&self, error: &(dyn Error + Send + Sync)) {
		let subscribers = self.subscribers.read().await.clone();
		for subscriber in subscribers {
			if let Err(e) = subscriber.on_error(&self.name, error).await {
				tracing::error!(
					pipeline = %self.name,
					subscriber = %subscriber.name(),
					"Subscriber failed to handle error: {:#}",
					e
				);
			}
		}
	}
}
