use std::fmt;

use scry_protocol::{AnchorHash, NodeIdentity, RawRecompositionReads, RawStateRead, RawTraceFrame, StringTable};

use crate::params::ParameterNode;
use crate::params::decode::decode_parameter;

/// Cache key for one recomposition of one composable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecompositionKey {
	pub anchor: AnchorHash,
	pub recomposition: u32,
}

impl RecompositionKey {
	pub const fn new(anchor: AnchorHash, recomposition: u32) -> Self {
		Self { anchor, recomposition }
	}
}

/// One frame of the call stack that performed a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
	pub declaring_class: String,
	pub method_name: String,
	pub file_name: String,
	pub line_number: i32,
}

impl fmt::Display for TraceFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}({}:{})", self.declaring_class, self.method_name, self.file_name, self.line_number)
	}
}

/// A state object read during a recomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRead {
	/// Value the read observed, decoded like any other parameter.
	pub value: ParameterNode,
	/// Identity hash of the state object.
	pub origin_instance: i32,
	/// True if the state had been invalidated before the read.
	pub invalidated: bool,
	/// Innermost frame first.
	pub trace: Vec<TraceFrame>,
}

/// Every read observed during one recomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct StateReadEntry {
	pub recomposition: u32,
	pub reads: Vec<StateRead>,
}

pub(crate) fn decode_recompositions(strings: &StringTable, node: NodeIdentity, raws: &[RawRecompositionReads]) -> Vec<StateReadEntry> {
	raws.iter()
		.map(|raw| StateReadEntry {
			recomposition: raw.recomposition,
			reads: raw.reads.iter().map(|read| decode_read(strings, node, read)).collect(),
		})
		.collect()
}

fn decode_read(strings: &StringTable, node: NodeIdentity, raw: &RawStateRead) -> StateRead {
	StateRead {
		value: decode_parameter(strings, node, &raw.value),
		origin_instance: raw.origin_instance,
		invalidated: raw.invalidated,
		trace: raw.trace.iter().map(|frame| decode_frame(strings, frame)).collect(),
	}
}

fn decode_frame(strings: &StringTable, raw: &RawTraceFrame) -> TraceFrame {
	TraceFrame {
		declaring_class: strings.get(raw.declaring_class).to_string(),
		method_name: strings.get(raw.method_name).to_string(),
		file_name: strings.get(raw.file_name).to_string(),
		line_number: raw.line_number,
	}
}
