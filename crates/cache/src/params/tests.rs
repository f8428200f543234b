use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use scry_protocol::{
	AnchorHash, NodeIdentity, ParameterType, RawParameter, RawParameterGroup, RawReference, RawValue, ReferenceKind,
	StringEntry, StringTable,
};

use super::decode::{decode_group, format_value};
use super::*;
use crate::{FetchError, Result};

const NODE: NodeIdentity = NodeIdentity::new(1, -5);

fn leaf(name: &str, index: i32) -> ParameterNode {
	ParameterNode::Leaf(ParameterItem::new(name, ParameterType::String, name, NODE, index))
}

fn element(index: i32) -> ParameterNode {
	leaf(&format!("[{index}]"), index)
}

fn reference(parameter_index: i32, path: &[i32]) -> ParameterReference {
	ParameterReference {
		node: NODE,
		anchor: AnchorHash(105),
		kind: ReferenceKind::Normal,
		parameter_index,
		composite_index: path.to_vec(),
	}
}

fn list(reference: Option<ParameterReference>, elements: Vec<ParameterNode>) -> ParameterGroupItem {
	ParameterGroupItem::new(ParameterItem::new("list", ParameterType::Iterable, "List[12]", NODE, 3), reference, elements)
}

fn indices(group: &ParameterGroupItem) -> Vec<i32> {
	group.elements().map(ParameterNode::index).collect()
}

fn assert_monotonic(group: &ParameterGroupItem) {
	let indices = indices(group);
	assert!(indices.windows(2).all(|w| w[0] < w[1]), "indices not strictly increasing: {indices:?}");
	let sentinels = group.children().iter().filter(|c| c.is_show_more()).count();
	assert!(sentinels <= 1);
	if sentinels == 1 {
		assert!(group.children().last().is_some_and(ParameterNode::is_show_more));
	}
}

/// Replays queued pages and records what was asked for.
struct ScriptedSource {
	max_initial: usize,
	pages: Mutex<VecDeque<Result<Option<ParameterNode>>>>,
	requests: Mutex<Vec<(i32, usize)>>,
	snapshot: Option<ParameterTree>,
}

impl ScriptedSource {
	fn new(max_initial: usize) -> Self {
		Self {
			max_initial,
			pages: Mutex::new(VecDeque::new()),
			requests: Mutex::new(Vec::new()),
			snapshot: None,
		}
	}

	fn with_snapshot(mut self, tree: ParameterTree) -> Self {
		self.snapshot = Some(tree);
		self
	}

	fn push(&self, page: Result<Option<ParameterNode>>) {
		self.pages.lock().push_back(page);
	}

	fn push_page(&self, reference: Option<ParameterReference>, elements: Vec<ParameterNode>) {
		self.push(Ok(Some(ParameterNode::Group(list(reference, elements)))));
	}

	fn requests(&self) -> Vec<(i32, usize)> {
		self.requests.lock().clone()
	}
}

#[async_trait]
impl ElementSource for ScriptedSource {
	fn max_initial_elements(&self) -> usize {
		self.max_initial
	}

	fn resolve_local(&self, reference: &ParameterReference) -> Option<ParameterGroupItem> {
		self.snapshot.as_ref()?.resolve(reference)
	}

	async fn fetch_elements(&self, _reference: &ParameterReference, start_index: i32, max_elements: usize) -> Result<Option<ParameterNode>> {
		self.requests.lock().push((start_index, max_elements));
		self.pages.lock().pop_front().unwrap_or(Err(FetchError::Cancelled))
	}
}

#[test]
fn test_new_orders_and_dedups_elements() {
	let group = list(Some(reference(1, &[3])), vec![element(3), element(0), element(3), element(1)]);
	assert_eq!(indices(&group), vec![0, 1, 3]);
	assert_eq!(group.state(), ExpansionState::PartiallyResolved);
	assert_eq!(group.show_more().map(ShowMoreElementsItem::index), Some(4));
}

#[test]
fn test_states() {
	assert_eq!(list(Some(reference(1, &[3])), Vec::new()).state(), ExpansionState::Unresolved);
	assert_eq!(list(None, vec![element(0)]).state(), ExpansionState::FullyResolved);
	assert!(list(None, vec![element(0)]).show_more().is_none());
}

#[tokio::test]
async fn test_expand_then_request_more_until_resolved() {
	let source = ScriptedSource::new(5);
	source.push_page(Some(reference(1, &[3])), vec![element(0), element(1)]);
	source.push_page(None, vec![element(2), element(3), element(4)]);

	let mut group = list(Some(reference(1, &[3])), Vec::new());
	assert!(group.expand(&source).await);
	assert_eq!(group.children().len(), 3);
	assert_eq!(indices(&group), vec![0, 1]);
	assert!(group.children()[2].is_show_more());

	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, 1, 2, 3, 4]);
	assert_eq!(group.children().len(), 5);
	assert!(group.reference().is_none());
	assert_eq!(group.state(), ExpansionState::FullyResolved);
	assert_eq!(source.requests(), vec![(0, 5), (2, 2)]);
}

#[tokio::test]
async fn test_last_possible_index_resolves_group() {
	let source = ScriptedSource::new(5);
	source.push_page(Some(reference(1, &[3])), vec![element(i32::MAX - 1), element(i32::MAX)]);

	let mut group = list(Some(reference(1, &[3])), vec![element(0)]);
	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, i32::MAX - 1, i32::MAX]);
	assert_eq!(group.state(), ExpansionState::FullyResolved);
	assert!(group.show_more().is_none());
	assert!(!group.request_more(&source).await);
	assert_eq!(source.requests(), vec![(1, 1)]);

	let group = list(Some(reference(1, &[3])), vec![element(i32::MAX)]);
	assert_eq!(group.state(), ExpansionState::FullyResolved);
}

#[tokio::test]
async fn test_paging_follows_agent_indices() {
	let source = ScriptedSource::new(5);
	source.push_page(Some(reference(1, &[11, 3])), vec![element(4), element(6)]);
	source.push_page(None, vec![element(7), element(10), element(11)]);

	let mut group = list(Some(reference(1, &[11, 3])), vec![element(0), element(3)]);
	assert_eq!(group.show_more().map(ShowMoreElementsItem::index), Some(4));

	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, 3, 4, 6]);
	assert_eq!(group.show_more().map(ShowMoreElementsItem::index), Some(7));
	assert!(group.reference().is_some());

	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, 3, 4, 6, 7, 10, 11]);
	assert!(group.show_more().is_none());
	assert_eq!(source.requests(), vec![(4, 2), (7, 4)]);
}

#[tokio::test]
async fn test_overlapping_page_is_not_duplicated() {
	let source = ScriptedSource::new(5);
	source.push_page(Some(reference(1, &[3])), vec![element(0), element(1), element(2), element(5)]);

	let mut group = list(Some(reference(1, &[3])), vec![element(0), element(1)]);
	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, 1, 2, 5]);
	assert_monotonic(&group);
}

#[tokio::test]
async fn test_expand_resolved_group_is_local() {
	let source = ScriptedSource::new(5);
	let mut partial = list(Some(reference(1, &[3])), vec![element(0)]);
	let mut full = list(None, vec![element(0)]);

	assert!(!partial.expand(&source).await);
	assert!(!full.expand(&source).await);
	assert!(!full.request_more(&source).await);
	assert!(source.requests().is_empty());
}

#[tokio::test]
async fn test_expand_gone_value_yields_empty() {
	let source = ScriptedSource::new(5);
	source.push(Ok(None));

	let mut group = list(Some(reference(1, &[3])), Vec::new());
	assert!(group.expand(&source).await);
	assert!(group.children().is_empty());
	assert!(group.reference().is_none());
	assert_eq!(group.state(), ExpansionState::FullyResolved);
}

#[tokio::test]
async fn test_request_more_gone_keeps_loaded() {
	let source = ScriptedSource::new(5);
	source.push(Ok(None));

	let mut group = list(Some(reference(1, &[3])), vec![element(0), element(2)]);
	assert!(group.request_more(&source).await);
	assert_eq!(indices(&group), vec![0, 2]);
	assert!(group.show_more().is_none());
	assert!(group.reference().is_none());
}

#[tokio::test]
async fn test_failed_fetch_leaves_state() {
	let source = ScriptedSource::new(5);
	source.push(Err(FetchError::Remote(scry_protocol::Error::Disconnected)));

	let mut group = list(Some(reference(1, &[3])), vec![element(0)]);
	let before = group.clone();
	assert!(!group.request_more(&source).await);
	assert_eq!(group, before);
}

#[tokio::test]
async fn test_clone_owns_its_children() {
	let source = ScriptedSource::new(5);
	source.push_page(None, vec![element(1), element(2)]);

	let original = list(Some(reference(1, &[3])), vec![element(0)]);
	let mut copy = original.clone();
	assert_eq!(copy.show_more(), original.show_more());

	assert!(copy.request_more(&source).await);
	assert_eq!(indices(&copy), vec![0, 1, 2]);
	assert_eq!(indices(&original), vec![0]);
	assert_eq!(original.show_more().map(ShowMoreElementsItem::index), Some(1));
	assert!(original.reference().is_some());
}

fn data_object_tree() -> ParameterTree {
	let string_property = ParameterGroupItem::new(
		ParameterItem::new("stringProperty", ParameterType::String, "stringValue", NODE, 0),
		Some(reference(1, &[])),
		Vec::new(),
	);
	let lines = ParameterGroupItem::new(
		ParameterItem::new("lines", ParameterType::String, "MyLineClass", NODE, 11),
		Some(reference(1, &[11])),
		Vec::new(),
	);
	let data_object = ParameterGroupItem::new(
		ParameterItem::new("dataObject", ParameterType::String, "PojoClass", NODE, 1),
		None,
		vec![
			ParameterNode::Group(string_property),
			ParameterNode::Leaf(ParameterItem::new("intProperty", ParameterType::Int32, "812", NODE, 1)),
			ParameterNode::Group(lines),
		],
	);
	ParameterTree::new(
		NODE,
		vec![leaf("onTextLayout", 0), ParameterNode::Group(data_object)],
		Vec::new(),
		Vec::new(),
	)
}

#[tokio::test]
async fn test_expand_resolves_loaded_reference_locally() {
	let tree = data_object_tree();
	let source = ScriptedSource::new(5).with_snapshot(tree.clone());

	let mut first = tree.get("dataObject").and_then(ParameterNode::as_group).unwrap().children()[0]
		.as_group()
		.unwrap()
		.clone();
	assert!(first.expand(&source).await);
	let names: Vec<_> = first.children().iter().map(ParameterNode::name).collect();
	assert_eq!(names, vec!["stringProperty", "intProperty", "lines"]);
	assert!(source.requests().is_empty());

	let mut lines = first.children()[2].as_group().unwrap().clone();
	source.push_page(None, vec![leaf("firstLine", 0), leaf("lastLine", 1)]);
	assert!(lines.expand(&source).await);
	assert_eq!(source.requests(), vec![(0, 5)]);
	assert_eq!(lines.children().len(), 2);
}

#[test]
fn test_tree_find_uses_agent_index() {
	let tree = data_object_tree();
	assert_eq!(tree.find(&reference(1, &[11])).map(ParameterNode::name), Some("lines"));
	assert!(tree.find(&reference(1, &[2])).is_none());
	assert!(tree.resolve(&reference(1, &[11])).is_none());
	assert!(tree.resolve(&reference(1, &[])).is_some());
	assert!(tree.find(&reference(7, &[])).is_none());
}

#[test]
fn test_decode_group() {
	let strings = StringTable::new(&[
		StringEntry::new(112, "onTextLayout"),
		StringEntry::new(114, "dataObject"),
		StringEntry::new(203, "PojoClass"),
		StringEntry::new(115, "intProperty"),
		StringEntry::new(117, "lines"),
		StringEntry::new(205, "MyLineClass"),
	]);
	let raw_ref = RawReference {
		composable_id: -5,
		anchor: AnchorHash(105),
		kind: ReferenceKind::Normal,
		parameter_index: 1,
		composite_index: vec![11],
	};
	let raw = RawParameterGroup {
		composable_id: -5,
		parameters: vec![
			RawParameter {
				kind: ParameterType::Lambda,
				name: 112,
				value: RawValue::Lambda {
					package_name: 1,
					file_name: 3,
					lambda_name: 202,
					start_line: 20,
					end_line: 21,
				},
				index: 0,
				reference: None,
				elements: Vec::new(),
			},
			RawParameter {
				kind: ParameterType::String,
				name: 114,
				value: RawValue::Int32(203),
				index: 0,
				reference: None,
				elements: vec![
					RawParameter {
						kind: ParameterType::Int32,
						name: 115,
						value: RawValue::Int32(812),
						index: 1,
						reference: None,
						elements: Vec::new(),
					},
					RawParameter {
						kind: ParameterType::String,
						name: 117,
						value: RawValue::Int32(205),
						index: 11,
						reference: Some(raw_ref),
						elements: Vec::new(),
					},
				],
			},
		],
		merged_semantics: Vec::new(),
		unmerged_semantics: Vec::new(),
	};

	let tree = decode_group(&strings, 1, &raw);
	assert_eq!(tree.node(), NODE);
	assert_eq!(tree.len(), 2);
	assert_eq!(tree.get("onTextLayout").and_then(ParameterNode::item).map(ParameterItem::value), Some("λ"));

	let data_object = tree.get("dataObject").and_then(ParameterNode::as_group).unwrap();
	assert_eq!(data_object.item().index(), 1);
	assert_eq!(data_object.item().value(), "PojoClass");
	assert_eq!(data_object.state(), ExpansionState::FullyResolved);

	let lines = data_object.children()[1].as_group().unwrap();
	assert_eq!(lines.state(), ExpansionState::Unresolved);
	assert_eq!(lines.reference(), Some(&reference(1, &[11])));
}

#[test]
fn test_format_value() {
	let strings = StringTable::new(&[StringEntry::new(24, "List[12]")]);
	assert_eq!(format_value(&strings, ParameterType::Iterable, &RawValue::Int32(24)), "List[12]");
	assert_eq!(format_value(&strings, ParameterType::DimensionDp, &RawValue::Float(1.0)), "1.0dp");
	assert_eq!(format_value(&strings, ParameterType::Color, &RawValue::Int32(-65536)), "#FFFF0000");
	assert_eq!(format_value(&strings, ParameterType::Boolean, &RawValue::Int32(1)), "true");
	assert_eq!(format_value(&strings, ParameterType::Int32, &RawValue::None), "null");
}

proptest! {
	#[test]
	fn paging_keeps_indices_strictly_increasing(pages in prop::collection::vec(prop::collection::vec(0i32..40, 0..6), 1..8)) {
		let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
		runtime.block_on(async {
			let source = ScriptedSource::new(5);
			let last = pages.len() - 1;
			for (page_no, page) in pages.iter().enumerate() {
				let more = (page_no < last).then(|| reference(1, &[3]));
				source.push_page(more, page.iter().map(|&i| element(i)).collect());
			}

			let mut group = list(Some(reference(1, &[3])), Vec::new());
			group.expand(&source).await;
			assert_monotonic(&group);
			while group.request_more(&source).await {
				assert_monotonic(&group);
			}
			assert_monotonic(&group);
		});
	}
}
