//! Commands, responses and events exchanged with the inspection agent.
//!
//! Payloads reference text through the message's string pool (see
//! [`StringTable`](crate::StringTable)); ids in `name` fields and in string-typed
//! values are pool ids, not text.

use serde::{Deserialize, Serialize};

use crate::ids::AnchorHash;
use crate::strings::StringEntry;

/// Declared type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
	/// Type not reported by the agent.
	Unspecified,
	/// Pooled string; the value is a pool id.
	String,
	/// Boolean.
	Boolean,
	/// 32-bit integer.
	Int32,
	/// 64-bit integer.
	Int64,
	/// 32-bit float.
	Float,
	/// 64-bit float.
	Double,
	/// ARGB color packed in an `Int32` value.
	Color,
	/// Resource reference rendered as pooled text.
	Resource,
	/// Density independent pixels.
	DimensionDp,
	/// Scale independent pixels.
	DimensionSp,
	/// Font relative size.
	DimensionEm,
	/// Lambda value.
	Lambda,
	/// Function reference.
	FunctionReference,
	/// List, array or map; the value is a pooled summary such as `List[12]`.
	Iterable,
}

/// Which parameter set of a composable a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
	/// Declared parameters of the composable.
	#[default]
	Normal,
	/// Merged semantics of the composable.
	Merged,
	/// Unmerged semantics of the composable.
	Unmerged,
}

/// Raw value slot of a parameter; interpreted according to [`ParameterType`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawValue {
	/// No value (e.g. `null`).
	#[default]
	None,
	/// 32-bit slot; also carries pool ids and packed colors.
	Int32(i32),
	/// 64-bit integer slot.
	Int64(i64),
	/// Float slot; also carries dimensions.
	Float(f32),
	/// Double slot.
	Double(f64),
	/// Boolean slot.
	Bool(bool),
	/// Lambda location; every text field is a pool id.
	Lambda {
		/// Package of the declaring file.
		package_name: i32,
		/// Declaring file.
		file_name: i32,
		/// Synthetic lambda name.
		lambda_name: i32,
		/// First source line.
		start_line: i32,
		/// Last source line.
		end_line: i32,
	},
}

/// Locator the agent can use to find a composite value again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawReference {
	/// Node owning the value.
	pub composable_id: i64,
	/// Anchor of the owning composable.
	pub anchor: AnchorHash,
	/// Parameter set the value lives in.
	#[serde(default)]
	pub kind: ReferenceKind,
	/// Position of the top-level parameter within its set.
	pub parameter_index: i32,
	/// Path of element indices from the top-level parameter down to the value.
	#[serde(default)]
	pub composite_index: Vec<i32>,
}

/// One parameter as sent by the agent, possibly with nested elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameter {
	/// Declared type.
	pub kind: ParameterType,
	/// Pool id of the name.
	pub name: i32,
	/// Value slot.
	#[serde(default)]
	pub value: RawValue,
	/// Index assigned by the agent within the parent; not necessarily contiguous.
	#[serde(default)]
	pub index: i32,
	/// Present when the agent holds elements beyond `elements`.
	#[serde(default)]
	pub reference: Option<RawReference>,
	/// Elements sent along with this parameter.
	#[serde(default)]
	pub elements: Vec<RawParameter>,
}

/// All parameter sets of one composable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameterGroup {
	/// Node the parameters belong to.
	pub composable_id: i64,
	/// Declared parameters.
	#[serde(default)]
	pub parameters: Vec<RawParameter>,
	/// Merged semantics.
	#[serde(default)]
	pub merged_semantics: Vec<RawParameter>,
	/// Unmerged semantics.
	#[serde(default)]
	pub unmerged_semantics: Vec<RawParameter>,
}

/// One frame of a state read's call stack; text fields are pool ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTraceFrame {
	/// Declaring class.
	pub declaring_class: i32,
	/// Method name.
	pub method_name: i32,
	/// Source file.
	pub file_name: i32,
	/// Source line.
	pub line_number: i32,
}

/// One observed state read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStateRead {
	/// Value observed by the read.
	pub value: RawParameter,
	/// True if the state was invalidated before it was read.
	#[serde(default)]
	pub invalidated: bool,
	/// Identity hash of the state object read.
	#[serde(default)]
	pub origin_instance: i32,
	/// Call stack of the read, innermost first.
	#[serde(default)]
	pub trace: Vec<RawTraceFrame>,
}

/// State reads observed during one recomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecompositionReads {
	/// Recomposition number of the composable.
	pub recomposition: u32,
	/// Reads observed in that recomposition.
	#[serde(default)]
	pub reads: Vec<RawStateRead>,
}

/// Reply to [`Command::GetParameters`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParametersResponse {
	/// String pool.
	#[serde(default)]
	pub strings: Vec<StringEntry>,
	/// `None` when the composable no longer exists.
	#[serde(default)]
	pub group: Option<RawParameterGroup>,
}

/// Reply to [`Command::GetAllParameters`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllParametersResponse {
	/// Root the groups belong to.
	pub root_id: i64,
	/// String pool.
	#[serde(default)]
	pub strings: Vec<StringEntry>,
	/// One group per composable of the root.
	#[serde(default)]
	pub groups: Vec<RawParameterGroup>,
}

/// Reply to [`Command::GetParameterDetails`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterDetailsResponse {
	/// Root the value belongs to.
	pub root_id: i64,
	/// String pool.
	#[serde(default)]
	pub strings: Vec<StringEntry>,
	/// `None` when the referenced value no longer exists.
	#[serde(default)]
	pub parameter: Option<RawParameter>,
}

/// Reply to [`Command::GetRecompositionStateReads`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReadsResponse {
	/// Composable the reads belong to.
	pub anchor: AnchorHash,
	/// String pool.
	#[serde(default)]
	pub strings: Vec<StringEntry>,
	/// Retained recompositions; empty when the requested one has not happened yet.
	#[serde(default)]
	pub recompositions: Vec<RawRecompositionReads>,
	/// Earliest recomposition whose reads the agent still retains.
	#[serde(default)]
	pub first_retained_recomposition: u32,
}

/// Pushed by the agent after a tracked composable recomposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReadEvent {
	/// Composable the reads belong to.
	pub anchor: AnchorHash,
	/// String pool.
	#[serde(default)]
	pub strings: Vec<StringEntry>,
	/// New recompositions with their reads.
	#[serde(default)]
	pub recompositions: Vec<RawRecompositionReads>,
	/// Earliest recomposition whose reads the agent still retains.
	#[serde(default)]
	pub first_retained_recomposition: u32,
}

/// Command sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
	/// Fetch every parameter set of one composable.
	GetParameters {
		/// Root of the composable.
		root_id: i64,
		/// Node id of the composable.
		composable_id: i64,
		/// Anchor of the composable.
		anchor: AnchorHash,
		/// Layout generation the caller is looking at.
		generation: u32,
		/// Maximum number of elements sent for composite values.
		max_initial_elements: u32,
	},
	/// Fetch every parameter set of every composable under a root.
	GetAllParameters {
		/// Root to fetch.
		root_id: i64,
		/// Layout generation the caller is looking at.
		generation: u32,
		/// Maximum number of elements sent for composite values.
		max_initial_elements: u32,
	},
	/// Fetch elements of a composite value.
	GetParameterDetails {
		/// Root of the owning composable.
		root_id: i64,
		/// Layout generation the reference was issued in.
		generation: u32,
		/// Value to expand.
		reference: RawReference,
		/// First element index to send.
		start_index: i32,
		/// Maximum number of elements to send.
		max_elements: u32,
	},
	/// Fetch the state reads of one recomposition.
	GetRecompositionStateReads {
		/// Composable to query.
		anchor: AnchorHash,
		/// Recomposition number.
		recomposition: u32,
	},
	/// Start recording state reads for one composable.
	StartTrackingStateReads {
		/// Composable to observe.
		anchor: AnchorHash,
	},
	/// Stop recording state reads for the observed composable.
	StopTrackingStateReads,
}

impl Command {
	/// Short name used in logs and errors.
	pub fn name(&self) -> &'static str {
		match self {
			Self::GetParameters { .. } => "get_parameters",
			Self::GetAllParameters { .. } => "get_all_parameters",
			Self::GetParameterDetails { .. } => "get_parameter_details",
			Self::GetRecompositionStateReads { .. } => "get_recomposition_state_reads",
			Self::StartTrackingStateReads { .. } => "start_tracking_state_reads",
			Self::StopTrackingStateReads => "stop_tracking_state_reads",
		}
	}
}

/// Reply from the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
	/// Reply to [`Command::GetParameters`].
	Parameters(ParametersResponse),
	/// Reply to [`Command::GetAllParameters`].
	AllParameters(AllParametersResponse),
	/// Reply to [`Command::GetParameterDetails`].
	ParameterDetails(ParameterDetailsResponse),
	/// Reply to [`Command::GetRecompositionStateReads`].
	StateReads(StateReadsResponse),
	/// Acknowledges a command without payload.
	Ack,
	/// The agent does not understand the command (older agent version).
	UnknownCommand,
}

/// Unsolicited message pushed by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
	/// A tracked composable recomposed.
	StateReads(StateReadEvent),
	/// A root was laid out again; cached parameters of that root are stale.
	LayoutUpdate {
		/// Root that changed.
		root_id: i64,
		/// New layout generation of the root.
		generation: u32,
	},
}
