//! Identities scoped to one inspected process session.

use serde::{Deserialize, Serialize};

/// Identity of one node in the inspected view tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdentity {
	/// Id of the root view the node belongs to.
	pub root_id: i64,
	/// Id of the node within the session.
	pub node_id: i64,
}

impl NodeIdentity {
	/// Creates a node identity.
	pub const fn new(root_id: i64, node_id: i64) -> Self {
		Self { root_id, node_id }
	}
}

impl std::fmt::Display for NodeIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.root_id, self.node_id)
	}
}

/// Stable identity of a composable instance across its recompositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorHash(pub i32);

impl std::fmt::Display for AnchorHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A composable as known by the view-tree model.
///
/// The model owns node identity; caches only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComposableNode {
	/// Tree identity of the node.
	pub id: NodeIdentity,
	/// Anchor of the composable instance backing the node.
	pub anchor: AnchorHash,
}

impl ComposableNode {
	/// Creates a composable handle.
	pub const fn new(id: NodeIdentity, anchor: AnchorHash) -> Self {
		Self { id, anchor }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display() {
		assert_eq!(NodeIdentity::new(1, -5).to_string(), "1/-5");
		assert_eq!(AnchorHash(105).to_string(), "#105");
	}

	#[test]
	fn test_anchor_is_transparent() {
		let json = serde_json::to_string(&AnchorHash(42)).unwrap();
		assert_eq!(json, "42");
	}
}
