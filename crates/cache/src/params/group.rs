//! Lazily expandable composite values.
//!
//! A group moves through three states:
//!
//! * **Unresolved**: a reference is set and no elements are loaded.
//! * **PartiallyResolved**: a reference is set, some elements are loaded and a
//!   [`ShowMoreElementsItem`] trails the list.
//! * **FullyResolved**: no reference; every element is loaded and no sentinel.
//!
//! Element order follows the agent-assigned `index`, which can skip values the
//! agent filtered out. Paging is computed from that index, never from list
//! positions.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ParameterItem, ParameterNode, ParameterReference, ShowMoreElementsItem};
use crate::Result;

/// Where a group gets its elements from.
#[async_trait]
pub trait ElementSource: Send + Sync {
	/// Page size of the first fetch of an unresolved group.
	fn max_initial_elements(&self) -> usize;

	/// Returns a copy of the referenced value if it is already loaded on the client.
	fn resolve_local(&self, _reference: &ParameterReference) -> Option<ParameterGroupItem> {
		None
	}

	/// Fetches the referenced value with up to `max_elements` elements starting at
	/// `start_index`.
	///
	/// `Ok(None)` means the value no longer exists on the agent.
	async fn fetch_elements(&self, reference: &ParameterReference, start_index: i32, max_elements: usize) -> Result<Option<ParameterNode>>;
}

/// Expansion state of a [`ParameterGroupItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
	Unresolved,
	PartiallyResolved,
	FullyResolved,
}

/// Composite parameter whose elements may be fetched on demand.
///
/// The group owns its children. Cloning copies the whole subtree and regenerates
/// the sentinel, so paging one copy never changes another.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroupItem {
	item: ParameterItem,
	reference: Option<ParameterReference>,
	children: Vec<ParameterNode>,
}

impl ParameterGroupItem {
	/// Creates a group; `children` are ordered by index and deduplicated, and a
	/// sentinel is appended when a reference remains.
	pub fn new(item: ParameterItem, reference: Option<ParameterReference>, children: Vec<ParameterNode>) -> Self {
		let mut group = Self {
			item,
			reference,
			children: normalize(children),
		};
		group.close_if_exhausted();
		group.push_show_more();
		group
	}

	pub fn item(&self) -> &ParameterItem {
		&self.item
	}

	/// Reference to elements the agent still holds.
	pub fn reference(&self) -> Option<&ParameterReference> {
		self.reference.as_ref()
	}

	/// Loaded elements followed by the sentinel, if any.
	pub fn children(&self) -> &[ParameterNode] {
		&self.children
	}

	/// Loaded elements without the sentinel.
	pub fn elements(&self) -> impl Iterator<Item = &ParameterNode> {
		self.children.iter().filter(|c| !c.is_show_more())
	}

	/// Mutable access to a loaded element, for expanding nested groups in place.
	pub fn element_mut(&mut self, position: usize) -> Option<&mut ParameterNode> {
		self.children.get_mut(position).filter(|c| !c.is_show_more())
	}

	/// Trailing sentinel, present while partially resolved.
	pub fn show_more(&self) -> Option<&ShowMoreElementsItem> {
		match self.children.last() {
			Some(ParameterNode::ShowMore(more)) => Some(more),
			_ => None,
		}
	}

	pub fn state(&self) -> ExpansionState {
		match (&self.reference, self.elements().next()) {
			(None, _) => ExpansionState::FullyResolved,
			(Some(_), None) => ExpansionState::Unresolved,
			(Some(_), Some(_)) => ExpansionState::PartiallyResolved,
		}
	}

	/// Loads the first page of an unresolved group.
	///
	/// Returns true if the children changed. Any other state returns immediately
	/// without a remote call.
	pub async fn expand(&mut self, source: &dyn ElementSource) -> bool {
		if self.state() != ExpansionState::Unresolved {
			return false;
		}
		let Some(reference) = self.reference.clone() else {
			return false;
		};

		if let Some(local) = source.resolve_local(&reference) {
			debug!(name = %self.item.name(), node = %reference.node, "expanding from loaded snapshot");
			self.reference = local.reference;
			self.children = local.children;
			return true;
		}

		match source.fetch_elements(&reference, 0, source.max_initial_elements()).await {
			Ok(Some(ParameterNode::Group(value))) => {
				self.reference = value.reference;
				self.children = value.children;
				true
			}
			Ok(_) => {
				debug!(name = %self.item.name(), node = %reference.node, "referenced value is gone");
				self.reference = None;
				self.children.clear();
				true
			}
			Err(err) => {
				warn!(name = %self.item.name(), error = %err, "failed to expand parameter");
				false
			}
		}
	}

	/// Loads the next page of a partially resolved group; this is what activating
	/// the trailing sentinel does.
	///
	/// Returns true if the children changed.
	pub async fn request_more(&mut self, source: &dyn ElementSource) -> bool {
		if self.state() != ExpansionState::PartiallyResolved {
			return false;
		}
		let Some(reference) = self.reference.clone() else {
			return false;
		};

		let start_index = self.next_start_index();
		let max_elements = match self.elements().count() {
			0 => source.max_initial_elements(),
			loaded => loaded,
		};

		match source.fetch_elements(&reference, start_index, max_elements).await {
			Ok(Some(ParameterNode::Group(value))) => {
				self.merge(value.reference, value.children);
				true
			}
			Ok(_) => {
				debug!(name = %self.item.name(), node = %reference.node, "referenced value is gone");
				self.pop_show_more();
				self.reference = None;
				true
			}
			Err(err) => {
				warn!(name = %self.item.name(), error = %err, "failed to load more elements");
				false
			}
		}
	}

	/// Appends elements beyond the highest loaded index and refreshes the sentinel.
	fn merge(&mut self, reference: Option<ParameterReference>, incoming: Vec<ParameterNode>) {
		self.pop_show_more();
		let mut last = self.last_element_index();
		for node in incoming.into_iter().filter(|n| !n.is_show_more()) {
			let index = node.index();
			if last.is_none_or(|l| index > l) {
				self.children.push(node);
				last = Some(index);
			}
		}
		self.reference = reference;
		self.close_if_exhausted();
		self.push_show_more();
	}

	/// Nothing can follow an element at `i32::MAX`.
	fn close_if_exhausted(&mut self) {
		if self.last_element_index() == Some(i32::MAX) && self.reference.take().is_some() {
			debug!(name = %self.item.name(), "last possible element index loaded");
		}
	}

	fn last_element_index(&self) -> Option<i32> {
		self.elements().last().map(ParameterNode::index)
	}

	fn next_start_index(&self) -> i32 {
		self.last_element_index().map_or(0, |i| i.saturating_add(1))
	}

	fn pop_show_more(&mut self) {
		if self.children.last().is_some_and(ParameterNode::is_show_more) {
			self.children.pop();
		}
	}

	fn push_show_more(&mut self) {
		if self.state() == ExpansionState::PartiallyResolved && self.show_more().is_none() {
			let more = ShowMoreElementsItem::new(self.item.node(), self.next_start_index());
			self.children.push(ParameterNode::ShowMore(more));
		}
	}
}

/// Drops sentinels and orders elements by strictly increasing index.
fn normalize(mut children: Vec<ParameterNode>) -> Vec<ParameterNode> {
	children.retain(|c| !c.is_show_more());
	children.sort_by_key(ParameterNode::index);
	children.dedup_by_key(|c| c.index());
	children
}
