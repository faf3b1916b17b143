use proptest::prelude::*;
use std::collections::BTreeMap;

use thorchain_ingest::{
	models::{NodeInfo, NodeStatus},
	utils::tests::node::NodeInfoBuilder,
};

const MAX_NODES: usize = 30;

pub fn status_strategy() -> impl Strategy<Value = NodeStatus> {
	prop_oneof![
		3 => Just(NodeStatus::Active),
		2 => Just(NodeStatus::Standby),
		1 => Just(NodeStatus::Ready),
		1 => Just(NodeStatus::Whitelisted),
		1 => Just(NodeStatus::Disabled),
		1 => Just(NodeStatus::Unknown),
	]
}

pub fn node_strategy() -> impl Strategy<Value = NodeInfo> {
	(
		"thor1[a-z0-9]{6}",
		status_strategy(),
		any::<u64>(),
		"[0-9]\\.[0-9]{1,3}\\.[0-9]",
	)
		.prop_map(|(address, status, bond, version)| {
			NodeInfoBuilder::new(&address)
				.status(status)
				.total_bond(bond as u128)
				.version(&version)
				.build()
		})
}

/// Node sets with unique addresses
pub fn node_set_strategy() -> impl Strategy<Value = Vec<NodeInfo>> {
	prop::collection::vec(node_strategy(), 0..MAX_NODES).prop_map(|nodes| {
		nodes
			.into_iter()
			.map(|node| (node.node_address.clone(), node))
			.collect::<BTreeMap<_, _>>()
			.into_values()
			.collect()
	})
}

/// Two snapshots drawn from a shared pool of addresses, so nodes can persist, appear
/// and disappear between them.
pub fn snapshot_pair_strategy() -> impl Strategy<Value = (Vec<NodeInfo>, Vec<NodeInfo>)> {
	node_set_strategy().prop_flat_map(|pool| {
		let len = pool.len();
		(
			prop::collection::vec(any::<bool>(), len),
			prop::collection::vec(any::<bool>(), len),
			prop::collection::vec(status_strategy(), len),
		)
			.prop_map(move |(in_previous, in_current, next_status)| {
				let previous = pool
					.iter()
					.zip(&in_previous)
					.filter(|(_, keep)| **keep)
					.map(|(node, _)| node.clone())
					.collect();
				let current = pool
					.iter()
					.zip(&in_current)
					.zip(&next_status)
					.filter(|((_, keep), _)| **keep)
					.map(|((node, _), status)| NodeInfo {
						status: *status,
						..node.clone()
					})
					.collect();
				(previous, current)
			})
	})
}
