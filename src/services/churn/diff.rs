//! Node-set comparison.

use std::collections::HashSet;

use crate::models::{NodeInfo, NodeSetChanges};

fn sorted(mut nodes: Vec<NodeInfo>) -> Vec<NodeInfo> {
	nodes.sort_by(|a, b| a.ident().cmp(b.ident()));
	nodes
}

/// Compares two snapshots of the node set.
///
/// An empty `previous` snapshot is a bootstrap and yields no changes. Activation and
/// deactivation are judged on nodes present in `current`; a node that disappears is
/// reported as removed only. Every list is sorted by node identity.
pub fn diff(previous: &[NodeInfo], current: &[NodeInfo]) -> NodeSetChanges {
	if previous.is_empty() {
		return NodeSetChanges::empty();
	}

	let current_ids: HashSet<&str> = current.iter().map(NodeInfo::ident).collect();
	let previous_ids: HashSet<&str> = previous.iter().map(NodeInfo::ident).collect();
	let previous_active_ids: HashSet<&str> = previous
		.iter()
		.filter(|n| n.is_active())
		.map(NodeInfo::ident)
		.collect();

	let mut activated = Vec::new();
	let mut deactivated = Vec::new();
	let mut added = Vec::new();

	for node in current {
		let was_active = previous_active_ids.contains(node.ident());
		if node.is_active() && !was_active {
			activated.push(node.clone());
		} else if !node.is_active() && was_active {
			deactivated.push(node.clone());
		}

		if !previous_ids.contains(node.ident()) {
			added.push(node.clone());
		}
	}

	let removed = previous
		.iter()
		.filter(|n| !current_ids.contains(n.ident()))
		.cloned()
		.collect();

	NodeSetChanges {
		nodes_added: sorted(added),
		nodes_removed: sorted(removed),
		nodes_activated: sorted(activated),
		nodes_deactivated: sorted(deactivated),
		nodes_all: sorted(current.to_vec()),
		nodes_previous: sorted(previous.to_vec()),
		block_height: 0,
	}
}
