use std::collections::HashMap;

use scry_protocol::{NodeIdentity, ReferenceKind};

use super::{ParameterGroupItem, ParameterNode, ParameterReference};

/// Snapshot of every parameter set of one node.
///
/// Replaced wholesale when the node is fetched again.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTree {
	node: NodeIdentity,
	parameters: Vec<ParameterNode>,
	merged_semantics: Vec<ParameterNode>,
	unmerged_semantics: Vec<ParameterNode>,
	by_name: HashMap<String, usize>,
}

impl ParameterTree {
	pub fn new(
		node: NodeIdentity,
		parameters: Vec<ParameterNode>,
		merged_semantics: Vec<ParameterNode>,
		unmerged_semantics: Vec<ParameterNode>,
	) -> Self {
		let mut by_name = HashMap::with_capacity(parameters.len());
		for (position, param) in parameters.iter().enumerate() {
			by_name.entry(param.name().to_string()).or_insert(position);
		}
		Self {
			node,
			parameters,
			merged_semantics,
			unmerged_semantics,
			by_name,
		}
	}

	pub fn empty(node: NodeIdentity) -> Self {
		Self::new(node, Vec::new(), Vec::new(), Vec::new())
	}

	pub fn node(&self) -> NodeIdentity {
		self.node
	}

	/// Declared parameters in agent order.
	pub fn parameters(&self) -> &[ParameterNode] {
		&self.parameters
	}

	pub fn merged_semantics(&self) -> &[ParameterNode] {
		&self.merged_semantics
	}

	pub fn unmerged_semantics(&self) -> &[ParameterNode] {
		&self.unmerged_semantics
	}

	/// Parameter set a reference of `kind` points into.
	pub fn section(&self, kind: ReferenceKind) -> &[ParameterNode] {
		match kind {
			ReferenceKind::Normal => &self.parameters,
			ReferenceKind::Merged => &self.merged_semantics,
			ReferenceKind::Unmerged => &self.unmerged_semantics,
		}
	}

	/// Number of declared parameters.
	pub fn len(&self) -> usize {
		self.parameters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.parameters.is_empty() && self.merged_semantics.is_empty() && self.unmerged_semantics.is_empty()
	}

	/// Looks up a declared parameter by name.
	pub fn get(&self, name: &str) -> Option<&ParameterNode> {
		self.by_name.get(name).and_then(|&pos| self.parameters.get(pos))
	}

	/// Walks a reference down the loaded values.
	///
	/// The top level is addressed by position; every nested step by agent index.
	pub fn find(&self, reference: &ParameterReference) -> Option<&ParameterNode> {
		if reference.node != self.node {
			return None;
		}
		let position = usize::try_from(reference.parameter_index).ok()?;
		let mut current = self.section(reference.kind).get(position)?;
		for &index in &reference.composite_index {
			current = current.as_group()?.elements().find(|c| c.index() == index)?;
		}
		Some(current)
	}

	/// Copies the referenced value if its elements are already loaded.
	pub fn resolve(&self, reference: &ParameterReference) -> Option<ParameterGroupItem> {
		let group = self.find(reference)?.as_group()?;
		group.elements().next()?;
		Some(group.clone())
	}
}
