use async_trait::async_trait;
use mockall::mock;
use std::error::Error;

use thorchain_ingest::{
	models::{BlockResult, NodeSetChanges},
	services::{churn::JobSchedulerTrait, pipeline::Subscriber},
};

mock! {
	/// Subscriber calls; the upstream error is handed over as its message.
	pub BlockSubscriber {
		pub fn name(&self) -> String;
		pub fn on_data(&self, sender: &str, data: &BlockResult) -> anyhow::Result<()>;
		pub fn on_error(&self, sender: &str, error: String) -> anyhow::Result<()>;
	}
}

#[async_trait]
impl Subscriber<BlockResult> for MockBlockSubscriber {
	fn name(&self) -> String {
		MockBlockSubscriber::name(self)
	}

	async fn on_data(&self, sender: &str, data: &BlockResult) -> anyhow::Result<()> {
		MockBlockSubscriber::on_data(self, sender, data)
	}

	async fn on_error(&self, sender: &str, error: &(dyn Error + Send + Sync)) -> anyhow::Result<()> {
		MockBlockSubscriber::on_error(self, sender, error.to_string())
	}
}

mock! {
	pub ChurnSubscriber {
		pub fn name(&self) -> String;
		pub fn on_data(&self, sender: &str, data: &NodeSetChanges) -> anyhow::Result<()>;
		pub fn on_error(&self, sender: &str, error: String) -> anyhow::Result<()>;
	}
}

#[async_trait]
impl Subscriber<NodeSetChanges> for MockChurnSubscriber {
	fn name(&self) -> String {
		MockChurnSubscriber::name(self)
	}

	async fn on_data(&self, sender: &str, data: &NodeSetChanges) -> anyhow::Result<()> {
		MockChurnSubscriber::on_data(self, sender, data)
	}

	async fn on_error(&self, sender: &str, error: &(dyn Error + Send + Sync)) -> anyhow::Result<()> {
		MockChurnSubscriber::on_error(self, sender, error.to_string())
	}
}

mock! {
	pub JobScheduler {}

	#[async_trait]
	impl JobSchedulerTrait for JobScheduler {
		async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
		async fn add(&self, job: tokio_cron_scheduler::Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
		async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
		async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	}
}
