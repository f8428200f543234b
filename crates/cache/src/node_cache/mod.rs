//! Per-node parameter cache.
//!
//! Snapshots are fetched on first access and kept until the owning root is laid
//! out again, the node is torn down, or the session ends.
//!
//! # Concurrency
//!
//! - `state`: `RwLock` over the snapshots, the per-root layout generation and
//!   the per-root count of bulk installs
//! - `flights`: single-flight table keyed by `(node, generation)`, so concurrent
//!   callers share one fetch and a fetch for a newer layout never joins an older one
//!
//! The remote round-trip runs with no lock held.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use scry_protocol::{AllParametersResponse, Command, ComposableNode, NodeIdentity, RemoteEndpoint, Response, StringTable};
use tracing::{debug, trace, warn};

use crate::config::InspectorSettings;
use crate::flight::SingleFlight;
use crate::params::decode::{decode_group, decode_parameter};
use crate::params::{ElementSource, ParameterGroupItem, ParameterNode, ParameterReference, ParameterTree};
use crate::scope::SessionScope;
use crate::{FetchError, Result};

#[derive(Default)]
struct CacheState {
	trees: HashMap<NodeIdentity, Arc<ParameterTree>>,
	/// Layout generation per root; absent means 0.
	generations: HashMap<i64, u32>,
	/// Bumped by every `set_all_from`; never reset.
	bulk_installs: HashMap<i64, u64>,
}

impl CacheState {
	fn generation(&self, root_id: i64) -> u32 {
		self.generations.get(&root_id).copied().unwrap_or(0)
	}

	fn bulk_epoch(&self, root_id: i64) -> u64 {
		self.bulk_installs.get(&root_id).copied().unwrap_or(0)
	}
}

/// Cache of full parameter snapshots keyed by node.
pub struct NodeParameterCache {
	endpoint: Arc<dyn RemoteEndpoint>,
	scope: SessionScope,
	max_initial_elements: usize,
	state: RwLock<CacheState>,
	flights: SingleFlight<(NodeIdentity, u32), Arc<ParameterTree>>,
}

impl NodeParameterCache {
	pub fn new(endpoint: Arc<dyn RemoteEndpoint>, scope: SessionScope, settings: &InspectorSettings) -> Self {
		Self {
			endpoint,
			scope,
			max_initial_elements: settings.max_initial_elements,
			state: RwLock::new(CacheState::default()),
			flights: SingleFlight::new(),
		}
	}

	/// Returns the cached snapshot without fetching.
	pub fn peek(&self, node: NodeIdentity) -> Option<Arc<ParameterTree>> {
		self.state.read().trees.get(&node).cloned()
	}

	/// Current layout generation of a root.
	pub fn generation(&self, root_id: i64) -> u32 {
		self.state.read().generation(root_id)
	}

	/// Number of cached snapshots.
	pub fn len(&self) -> usize {
		self.state.read().trees.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns the node's snapshot, fetching it on a miss.
	///
	/// `None` means the node no longer exists on the agent, the fetch failed, or
	/// the session was torn down; callers treat all three as "node gone".
	pub async fn get(&self, node: &ComposableNode) -> Option<Arc<ParameterTree>> {
		if let Some(tree) = self.peek(node.id) {
			trace!(node = %node.id, "parameter cache hit");
			return Some(tree);
		}

		let generation = self.generation(node.id.root_id);
		let fetch = async {
			// A previous leader may have installed it since the fast path.
			let epoch = {
				let state = self.state.read();
				if let Some(tree) = state.trees.get(&node.id) {
					return Some(tree.clone());
				}
				state.bulk_epoch(node.id.root_id)
			};
			match self.fetch(node, generation).await {
				Ok(Some(tree)) => {
					let tree = Arc::new(tree);
					self.install(node.id, generation, epoch, tree.clone());
					Some(tree)
				}
				Ok(None) => {
					debug!(node = %node.id, "node no longer exists on the agent");
					None
				}
				Err(err) => {
					warn!(node = %node.id, error = %err, "failed to fetch parameters");
					None
				}
			}
		};

		self.scope.run(self.flights.run((node.id, generation), fetch)).await.flatten()
	}

	async fn fetch(&self, node: &ComposableNode, generation: u32) -> Result<Option<ParameterTree>> {
		debug!(node = %node.id, anchor = %node.anchor, generation, "fetching parameters");
		let command = Command::GetParameters {
			root_id: node.id.root_id,
			composable_id: node.id.node_id,
			anchor: node.anchor,
			generation,
			max_initial_elements: self.page_size(self.max_initial_elements),
		};
		match self.endpoint.send(command).await? {
			Response::Parameters(response) => {
				let strings = StringTable::new(&response.strings);
				Ok(response.group.map(|group| decode_group(&strings, node.id.root_id, &group)))
			}
			_ => Err(FetchError::UnexpectedResponse { command: "get_parameters" }),
		}
	}

	fn install(&self, node: NodeIdentity, generation: u32, epoch: u64, tree: Arc<ParameterTree>) {
		let mut state = self.state.write();
		if state.generation(node.root_id) != generation {
			debug!(node = %node, generation, "dropping parameters fetched for a previous layout");
			return;
		}
		if state.bulk_epoch(node.root_id) != epoch {
			debug!(node = %node, "dropping parameters superseded by a bulk load");
			return;
		}
		state.trees.insert(node, tree);
	}

	/// Fetches every node of a root in one round-trip and installs the result.
	///
	/// Returns false if nothing was installed.
	pub async fn load_all(&self, root_id: i64) -> bool {
		let command = Command::GetAllParameters {
			root_id,
			generation: self.generation(root_id),
			max_initial_elements: self.page_size(self.max_initial_elements),
		};
		let err = match self.scope.run(self.endpoint.send(command)).await {
			Some(Ok(Response::AllParameters(response))) => {
				self.set_all_from(&response);
				return true;
			}
			Some(Ok(_)) => FetchError::UnexpectedResponse {
				command: "get_all_parameters",
			},
			Some(Err(err)) => FetchError::from(err),
			None => return false,
		};
		warn!(root_id, error = %err, "failed to load parameters");
		false
	}

	/// Replaces every snapshot of the response's root with the response content.
	pub fn set_all_from(&self, response: &AllParametersResponse) {
		let strings = StringTable::new(&response.strings);
		let trees: Vec<_> = response
			.groups
			.iter()
			.map(|group| decode_group(&strings, response.root_id, group))
			.collect();

		let mut state = self.state.write();
		let epoch = state.bulk_installs.entry(response.root_id).or_default();
		*epoch = epoch.wrapping_add(1);
		state.trees.retain(|node, _| node.root_id != response.root_id);
		for tree in trees {
			state.trees.insert(tree.node(), Arc::new(tree));
		}
		debug!(root_id = response.root_id, nodes = response.groups.len(), "installed parameters for root");
	}

	/// Drops every snapshot of a root after it was laid out again.
	///
	/// Fetches still in flight for the previous generation are not installed.
	pub fn on_layout_update(&self, root_id: i64, generation: u32) {
		let mut state = self.state.write();
		state.generations.insert(root_id, generation);
		state.trees.retain(|node, _| node.root_id != root_id);
		debug!(root_id, generation, "invalidated parameters for root");
	}

	/// Drops the snapshot of a torn-down node.
	pub fn remove(&self, node: NodeIdentity) -> Option<Arc<ParameterTree>> {
		self.state.write().trees.remove(&node)
	}

	/// Drops everything; called when the session ends.
	///
	/// Bulk install counts survive so fetches still in flight stay superseded.
	pub fn clear(&self) {
		let mut state = self.state.write();
		state.trees.clear();
		state.generations.clear();
	}

	fn page_size(&self, count: usize) -> u32 {
		u32::try_from(count).unwrap_or(u32::MAX)
	}
}

#[async_trait]
impl ElementSource for NodeParameterCache {
	fn max_initial_elements(&self) -> usize {
		self.max_initial_elements
	}

	fn resolve_local(&self, reference: &ParameterReference) -> Option<ParameterGroupItem> {
		self.peek(reference.node)?.resolve(reference)
	}

	async fn fetch_elements(&self, reference: &ParameterReference, start_index: i32, max_elements: usize) -> Result<Option<ParameterNode>> {
		let root_id = reference.node.root_id;
		debug!(node = %reference.node, start_index, max_elements, "fetching parameter elements");
		let command = Command::GetParameterDetails {
			root_id,
			generation: self.generation(root_id),
			reference: reference.to_raw(),
			start_index,
			max_elements: self.page_size(max_elements),
		};
		let response = self.scope.run(self.endpoint.send(command)).await.ok_or(FetchError::Cancelled)??;
		match response {
			Response::ParameterDetails(details) => {
				let strings = StringTable::new(&details.strings);
				Ok(details.parameter.map(|raw| decode_parameter(&strings, reference.node, &raw)))
			}
			_ => Err(FetchError::UnexpectedResponse {
				command: "get_parameter_details",
			}),
		}
	}
}
