//! Parameter values of inspected composables.
//!
//! [`ParameterTree`] is one node's snapshot. Its rows are [`ParameterNode`]s:
//! leaves, [`ParameterGroupItem`]s that can page in more elements from the agent,
//! and the [`ShowMoreElementsItem`] sentinel trailing a partially loaded group.

pub(crate) mod decode;
mod group;
mod item;
mod tree;

pub use group::{ElementSource, ExpansionState, ParameterGroupItem};
pub use item::{ParameterItem, ParameterNode, ParameterReference, ShowMoreElementsItem};
pub use tree::ParameterTree;

#[cfg(test)]
mod tests;
