//! Cron-driven node list polling.

use anyhow::Context;
use std::{collections::HashMap, sync::Arc};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
	models::ChurnConfig,
	services::{
		cache::NodeListCached,
		churn::ChurnError,
		pipeline::{DelegatePipeline, NodeSnapshot},
	},
};

/// Scheduler abstraction so jobs can be driven by a test double
#[async_trait::async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait::async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map(|_| ()).map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map(|_| ()).map_err(Into::into)
	}
}

/// Fetches the node list through its cache and hands it to `pipeline`.
///
/// A failed fetch is broadcast to the pipeline subscribers as an error.
///
/// # Returns
/// Number of nodes dispatched
pub async fn poll_node_list(
	source: &NodeListCached,
	pipeline: &DelegatePipeline<NodeSnapshot>,
) -> Result<usize, ChurnError> {
	match source.nodes().await {
		Ok(nodes) => {
			pipeline.dispatch(&nodes).await;
			Ok(nodes.len())
		}
		Err(e) => {
			pipeline.broadcast_error(&e).await;
			Err(ChurnError::Other(
				anyhow::Error::new(e).context("failed to fetch node list"),
			))
		}
	}
}

/// Polls the node list on a cron schedule.
pub struct NodeListJob<J: JobSchedulerTrait> {
	schedule: String,
	source: Arc<NodeListCached>,
	pipeline: Arc<DelegatePipeline<NodeSnapshot>>,
	scheduler: J,
}

impl<J: JobSchedulerTrait> NodeListJob<J> {
	pub async fn new(
		config: &ChurnConfig,
		source: Arc<NodeListCached>,
		pipeline: Arc<DelegatePipeline<NodeSnapshot>>,
	) -> Result<Self, ChurnError> {
		let scheduler = J::new().await.map_err(|e| {
			ChurnError::scheduler_error(e.to_string(), Some(e), Some(schedule_metadata(config)))
		})?;
		Ok(Self {
			schedule: config.cron_schedule.clone(),
			source,
			pipeline,
			scheduler,
		})
	}

	pub fn schedule(&self) -> &str {
		&self.schedule
	}

	pub async fn start(&mut self) -> Result<(), ChurnError> {
		let source = self.source.clone();
		let pipeline = self.pipeline.clone();

		let job = Job::new_async(self.schedule.as_str(), move |_uuid, _l| {
			let source = source.clone();
			let pipeline = pipeline.clone();
			Box::pin(async move {
				match poll_node_list(&source, &pipeline).await {
					Ok(count) => tracing::debug!(nodes = count, "Node list polled"),
					Err(e) => tracing::warn!("Node list poll failed: {}", e),
				}
			})
		})
		.with_context(|| format!("Failed to create job for schedule '{}'", self.schedule))?;

		let metadata = HashMap::from([("schedule".to_string(), self.schedule.clone())]);
		self.scheduler.add(job).await.map_err(|e| {
			ChurnError::scheduler_error(e.to_string(), Some(e), Some(metadata.clone()))
		})?;
		self.scheduler
			.start()
			.await
			.map_err(|e| ChurnError::scheduler_error(e.to_string(), Some(e), Some(metadata)))?;

		tracing::info!(schedule = %self.schedule, "Started node list job");
		Ok(())
	}

	pub async fn stop(&mut self) -> Result<(), ChurnError> {
		self.scheduler.shutdown().await.map_err(|e| {
			ChurnError::scheduler_error(
				e.to_string(),
				Some(e),
				Some(HashMap::from([("schedule".to_string(), self.schedule.clone())])),
			)
		})?;
		tracing::info!(schedule = %self.schedule, "Stopped node list job");
		Ok(())
	}
}

fn schedule_metadata(config: &ChurnConfig) -> HashMap<String, String> {
	HashMap::from([("schedule".to_string(), config.cron_schedule.clone())])
}
