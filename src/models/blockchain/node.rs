//! Validator node snapshots and the churn diff between two of them.

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a node as reported by `/thorchain/nodes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeStatus {
	Active,
	Standby,
	Ready,
	Whitelisted,
	Disabled,
	#[default]
	#[serde(other)]
	Unknown,
}

/// One node of the validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeInfo {
	pub node_address: String,
	#[serde(default)]
	pub status: NodeStatus,
	#[serde(default, deserialize_with = "de_amount")]
	pub total_bond: u128,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub ip_address: String,
	#[serde(default)]
	pub slash_points: i64,
	#[serde(default)]
	pub active_block_height: u64,
	#[serde(default)]
	pub requested_to_leave: bool,
	#[serde(default)]
	pub forced_to_leave: bool,
}

impl NodeInfo {
	/// Identity used for set membership
	pub fn ident(&self) -> &str {
		&self.node_address
	}

	pub fn is_active(&self) -> bool {
		self.status == NodeStatus::Active
	}
}

/// Node amounts arrive either as JSON strings or as numbers.
fn de_amount<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Amount {
		Text(String),
		Number(u64),
	}

	match Amount::deserialize(deserializer)? {
		Amount::Number(n) => Ok(n as u128),
		Amount::Text(s) if s.is_empty() => Ok(0),
		Amount::Text(s) => s.parse::<u128>().map_err(serde::de::Error::custom),
	}
}

/// Difference between two node-set snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeSetChanges {
	pub nodes_added: Vec<NodeInfo>,
	pub nodes_removed: Vec<NodeInfo>,
	pub nodes_activated: Vec<NodeInfo>,
	pub nodes_deactivated: Vec<NodeInfo>,
	/// The current snapshot
	pub nodes_all: Vec<NodeInfo>,
	/// The snapshot it was compared against
	pub nodes_previous: Vec<NodeInfo>,
	/// Chain height at which the current snapshot was taken, when known
	#[serde(default)]
	pub block_height: u64,
}

impl NodeSetChanges {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn count_of_changes(&self) -> usize {
		self.nodes_added.len()
			+ self.nodes_removed.len()
			+ self.nodes_activated.len()
			+ self.nodes_deactivated.len()
	}

	pub fn is_empty(&self) -> bool {
		self.count_of_changes() == 0
	}

	/// An activation or deactivation took place; additions alone are not churn.
	pub fn has_churn_happened(&self) -> bool {
		!self.nodes_activated.is_empty() || !self.nodes_deactivated.is_empty()
	}

	pub fn active_only_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
		self.nodes_all.iter().filter(|n| n.is_active())
	}

	pub fn previous_active_only_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
		self.nodes_previous.iter().filter(|n| n.is_active())
	}
}
