//! Conversion of raw agent payloads into parameter values.

use scry_protocol::{NodeIdentity, ParameterType, RawParameter, RawParameterGroup, RawValue, StringTable};

use super::{ParameterGroupItem, ParameterItem, ParameterNode, ParameterReference, ParameterTree};

/// Decodes every parameter set of one composable under `root_id`.
pub(crate) fn decode_group(strings: &StringTable, root_id: i64, raw: &RawParameterGroup) -> ParameterTree {
	let node = NodeIdentity::new(root_id, raw.composable_id);
	ParameterTree::new(
		node,
		decode_section(strings, node, &raw.parameters),
		decode_section(strings, node, &raw.merged_semantics),
		decode_section(strings, node, &raw.unmerged_semantics),
	)
}

/// Top-level parameters are indexed by their position in the set.
fn decode_section(strings: &StringTable, node: NodeIdentity, raws: &[RawParameter]) -> Vec<ParameterNode> {
	raws.iter()
		.enumerate()
		.map(|(position, raw)| decode_at(strings, node, raw, i32::try_from(position).unwrap_or(i32::MAX)))
		.collect()
}

/// Decodes one parameter, keeping the agent-assigned index.
pub(crate) fn decode_parameter(strings: &StringTable, node: NodeIdentity, raw: &RawParameter) -> ParameterNode {
	decode_at(strings, node, raw, raw.index)
}

fn decode_at(strings: &StringTable, node: NodeIdentity, raw: &RawParameter, index: i32) -> ParameterNode {
	let item = ParameterItem::new(strings.get(raw.name), raw.kind, format_value(strings, raw.kind, &raw.value), node, index);
	if raw.reference.is_none() && raw.elements.is_empty() {
		return ParameterNode::Leaf(item);
	}
	let reference = raw.reference.as_ref().map(|r| ParameterReference::from_raw(node.root_id, r));
	let elements = raw.elements.iter().map(|e| decode_parameter(strings, node, e)).collect();
	ParameterNode::Group(ParameterGroupItem::new(item, reference, elements))
}

/// Renders a value slot according to its declared type.
pub(crate) fn format_value(strings: &StringTable, kind: ParameterType, value: &RawValue) -> String {
	match (kind, value) {
		(_, RawValue::None) => "null".to_string(),
		(_, RawValue::Lambda { .. }) => "λ".to_string(),
		(
			ParameterType::String | ParameterType::Resource | ParameterType::Iterable | ParameterType::FunctionReference,
			RawValue::Int32(id),
		) => strings.get(*id).to_string(),
		(ParameterType::Boolean, RawValue::Int32(v)) => (*v != 0).to_string(),
		(ParameterType::Color, RawValue::Int32(argb)) => format!("#{:08X}", *argb as u32),
		(ParameterType::DimensionDp, RawValue::Float(v)) => format!("{v:?}dp"),
		(ParameterType::DimensionSp, RawValue::Float(v)) => format!("{v:?}sp"),
		(ParameterType::DimensionEm, RawValue::Float(v)) => format!("{v:?}em"),
		(_, RawValue::Int32(v)) => v.to_string(),
		(_, RawValue::Int64(v)) => v.to_string(),
		(_, RawValue::Float(v)) => format!("{v:?}"),
		(_, RawValue::Double(v)) => format!("{v:?}"),
		(_, RawValue::Bool(v)) => v.to_string(),
	}
}
