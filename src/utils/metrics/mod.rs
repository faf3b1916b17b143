//! Prometheus metrics.
//!
//! All metrics live in one global registry that the `/metrics` endpoint encodes.
//! Host gauges are refreshed on every scrape; pipeline metrics are updated as work happens.

pub mod server;

use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use sysinfo::{Disks, System};

fn gauge(name: &str, help: &str) -> Gauge {
	let gauge = Gauge::new(name, help).unwrap();
	REGISTRY.register(Box::new(gauge.clone())).unwrap();
	gauge
}

fn gauge_vec(name: &str, help: &str, labels: &[&str]) -> GaugeVec {
	let gauge = GaugeVec::new(Opts::new(name, help), labels).unwrap();
	REGISTRY.register(Box::new(gauge.clone())).unwrap();
	gauge
}

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
	let counter = IntCounterVec::new(Opts::new(name, help), labels).unwrap();
	REGISTRY.register(Box::new(counter.clone())).unwrap();
	counter
}

lazy_static! {
	/// Global Prometheus registry.
	pub static ref REGISTRY: Registry = Registry::new();

	pub static ref CPU_USAGE: Gauge = gauge("cpu_usage_percentage", "Current CPU usage percentage");
	pub static ref MEMORY_USAGE_PERCENT: Gauge = gauge("memory_usage_percentage", "Memory usage percentage");
	pub static ref MEMORY_USAGE: Gauge = gauge("memory_usage_bytes", "Memory usage in bytes");
	pub static ref TOTAL_MEMORY: Gauge = gauge("total_memory_bytes", "Total memory in bytes");
	pub static ref AVAILABLE_MEMORY: Gauge = gauge("available_memory_bytes", "Available memory in bytes");
	pub static ref DISK_USAGE: Gauge = gauge("disk_usage_bytes", "Used disk space in bytes");
	pub static ref DISK_USAGE_PERCENT: Gauge = gauge("disk_usage_percentage", "Disk usage percentage");

	/// Height of the last block the scanner handed to subscribers, per network.
	pub static ref LAST_SCANNED_HEIGHT: GaugeVec =
		gauge_vec("scanner_last_scanned_height", "Last block height processed by the scanner", &["network"]);

	/// Chain tip as last reported by the node, per network.
	pub static ref CHAIN_TIP_HEIGHT: GaugeVec =
		gauge_vec("scanner_chain_tip_height", "Latest block height reported by the node", &["network"]);

	/// Blocks dispatched to subscribers, per network.
	pub static ref BLOCKS_DISPATCHED: IntCounterVec =
		counter_vec("scanner_blocks_dispatched_total", "Blocks dispatched to subscribers", &["network"]);

	/// Scan failures, per network and error code.
	pub static ref SCAN_ERRORS: IntCounterVec =
		counter_vec("scanner_errors_total", "Block fetch failures", &["network", "code"]);

	/// Deduplicator lookups, per filter name and outcome (`seen` or `new`).
	pub static ref DEDUP_CHECKS: IntCounterVec =
		counter_vec("dedup_checks_total", "Deduplicator membership checks", &["filter", "outcome"]);

	/// Subscriber failures, per pipeline stage.
	pub static ref SUBSCRIBER_ERRORS: IntCounterVec =
		counter_vec("pipeline_subscriber_errors_total", "Errors raised by pipeline subscribers", &["subscriber"]);

	/// Node-set changes seen by the churn detector, per change kind.
	pub static ref NODE_CHANGES: IntCounterVec =
		counter_vec("churn_node_changes_total", "Node-set changes detected", &["kind"]);
}

/// Encodes every registered metric in the Prometheus text format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let mut buffer = Vec::new();
	encoder.encode(&REGISTRY.gather(), &mut buffer)?;
	Ok(buffer)
}

fn percentage(part: u64, total: u64) -> f64 {
	if total == 0 {
		0.0
	} else {
		part as f64 / total as f64 * 100.0
	}
}

/// Refreshes the host CPU, memory and disk gauges.
pub fn update_system_metrics() {
	let mut sys = System::new_all();
	sys.refresh_all();

	CPU_USAGE.set(sys.global_cpu_usage() as f64);

	let total_memory = sys.total_memory();
	let used_memory = sys.used_memory();
	TOTAL_MEMORY.set(total_memory as f64);
	AVAILABLE_MEMORY.set(sys.available_memory() as f64);
	MEMORY_USAGE.set(used_memory as f64);
	MEMORY_USAGE_PERCENT.set(percentage(used_memory, total_memory));

	let disks = Disks::new_with_refreshed_list();
	let (total_disk, available_disk) = disks.list().iter().fold((0u64, 0u64), |acc, disk| {
		(acc.0 + disk.total_space(), acc.1 + disk.available_space())
	});
	let used_disk = total_disk.saturating_sub(available_disk);
	DISK_USAGE.set(used_disk as f64);
	DISK_USAGE_PERCENT.set(percentage(used_disk, total_disk));
}

/// Records the scanner position for `network`.
pub fn record_scan_progress(network: &str, last_scanned: u64, chain_tip: Option<u64>) {
	LAST_SCANNED_HEIGHT
		.with_label_values(&[network])
		.set(last_scanned as f64);
	if let Some(tip) = chain_tip {
		CHAIN_TIP_HEIGHT.with_label_values(&[network]).set(tip as f64);
	}
}
