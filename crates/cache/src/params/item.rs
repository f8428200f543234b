use scry_protocol::{AnchorHash, NodeIdentity, ParameterType, RawReference, ReferenceKind};

use super::ParameterGroupItem;

/// Immutable leaf parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterItem {
	name: String,
	kind: ParameterType,
	value: String,
	node: NodeIdentity,
	index: i32,
}

impl ParameterItem {
	/// Creates a leaf parameter.
	pub fn new(name: impl Into<String>, kind: ParameterType, value: impl Into<String>, node: NodeIdentity, index: i32) -> Self {
		Self {
			name: name.into(),
			kind,
			value: value.into(),
			node,
			index,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> ParameterType {
		self.kind
	}

	/// Formatted value.
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Node owning the parameter.
	pub fn node(&self) -> NodeIdentity {
		self.node
	}

	/// Index assigned by the agent; not a list position.
	pub fn index(&self) -> i32 {
		self.index
	}
}

/// Locator for a composite value held by the agent.
///
/// Carries enough to find the same value again after recompositions reorder or
/// resize its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterReference {
	/// Node owning the value.
	pub node: NodeIdentity,
	/// Anchor of the owning composable.
	pub anchor: AnchorHash,
	/// Parameter set the value lives in.
	pub kind: ReferenceKind,
	/// Position of the top-level parameter within its set.
	pub parameter_index: i32,
	/// Element indices from the top-level parameter down to the value.
	pub composite_index: Vec<i32>,
}

impl ParameterReference {
	pub(crate) fn from_raw(root_id: i64, raw: &RawReference) -> Self {
		Self {
			node: NodeIdentity::new(root_id, raw.composable_id),
			anchor: raw.anchor,
			kind: raw.kind,
			parameter_index: raw.parameter_index,
			composite_index: raw.composite_index.clone(),
		}
	}

	pub(crate) fn to_raw(&self) -> RawReference {
		RawReference {
			composable_id: self.node.node_id,
			anchor: self.anchor,
			kind: self.kind,
			parameter_index: self.parameter_index,
			composite_index: self.composite_index.clone(),
		}
	}
}

/// Pagination sentinel trailing a partially loaded group.
///
/// Lives only inside its owning group's children; activating it means calling
/// [`ParameterGroupItem::request_more`] on that group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowMoreElementsItem {
	node: NodeIdentity,
	index: i32,
}

impl ShowMoreElementsItem {
	pub(crate) fn new(node: NodeIdentity, index: i32) -> Self {
		Self { node, index }
	}

	pub fn node(&self) -> NodeIdentity {
		self.node
	}

	/// Start index of the next page.
	pub fn index(&self) -> i32 {
		self.index
	}
}

/// One row of a parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterNode {
	Leaf(ParameterItem),
	Group(ParameterGroupItem),
	ShowMore(ShowMoreElementsItem),
}

impl ParameterNode {
	/// Agent-assigned index; for a sentinel, the next start index.
	pub fn index(&self) -> i32 {
		match self {
			Self::Leaf(item) => item.index(),
			Self::Group(group) => group.item().index(),
			Self::ShowMore(more) => more.index(),
		}
	}

	/// Parameter data, absent for a sentinel.
	pub fn item(&self) -> Option<&ParameterItem> {
		match self {
			Self::Leaf(item) => Some(item),
			Self::Group(group) => Some(group.item()),
			Self::ShowMore(_) => None,
		}
	}

	pub fn name(&self) -> &str {
		self.item().map_or("", ParameterItem::name)
	}

	pub fn as_group(&self) -> Option<&ParameterGroupItem> {
		match self {
			Self::Group(group) => Some(group),
			_ => None,
		}
	}

	pub fn as_group_mut(&mut self) -> Option<&mut ParameterGroupItem> {
		match self {
			Self::Group(group) => Some(group),
			_ => None,
		}
	}

	pub fn is_show_more(&self) -> bool {
		matches!(self, Self::ShowMore(_))
	}
}
