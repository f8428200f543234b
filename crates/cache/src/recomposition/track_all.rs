use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use scry_protocol::{AnchorHash, ComposableNode, NodeIdentity, RemoteEndpoint, StateReadEvent, StringTable};
use tracing::{debug, trace, warn};

use super::reads::decode_recompositions;
use super::{RecompositionKey, StateReadEntry, StateReadStrategy, fetch_state_reads};
use crate::flight::SingleFlight;
use crate::scope::SessionScope;

/// What is known about one composable.
#[derive(Debug, Clone, Copy)]
struct AnchorInfo {
	/// Set once a read was fetched; needed to decode pushed reads.
	node: Option<NodeIdentity>,
	first_retained: u32,
}

struct TrackAllState {
	entries: LruCache<RecompositionKey, Arc<StateReadEntry>>,
	/// Bounded like `entries`, so churning composables cannot grow it.
	anchors: LruCache<AnchorHash, AnchorInfo>,
}

/// Keeps any fetched recomposition until evicted by the LRU bound.
///
/// Every lookup tolerates eviction by fetching again.
pub(crate) struct TrackAllStrategy {
	endpoint: Arc<dyn RemoteEndpoint>,
	scope: SessionScope,
	state: Mutex<TrackAllState>,
	flights: SingleFlight<RecompositionKey, Arc<StateReadEntry>>,
}

impl TrackAllStrategy {
	pub(crate) fn new(endpoint: Arc<dyn RemoteEndpoint>, scope: SessionScope, capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			endpoint,
			scope,
			state: Mutex::new(TrackAllState {
				entries: LruCache::new(capacity),
				anchors: LruCache::new(capacity),
			}),
			flights: SingleFlight::new(),
		}
	}

	fn lookup(&self, key: RecompositionKey) -> Option<Arc<StateReadEntry>> {
		self.state.lock().entries.get(&key).cloned()
	}

	/// Installs decoded recompositions, returning the one at `wanted` if present.
	fn store(&self, node: NodeIdentity, anchor: AnchorHash, entries: Vec<StateReadEntry>, first_retained: u32, wanted: Option<u32>) -> Option<Arc<StateReadEntry>> {
		let mut state = self.state.lock();
		state.anchors.put(
			anchor,
			AnchorInfo {
				node: Some(node),
				first_retained,
			},
		);
		let mut found = None;
		for entry in entries {
			let entry = Arc::new(entry);
			if Some(entry.recomposition) == wanted {
				found = Some(entry.clone());
			}
			state.entries.put(RecompositionKey::new(anchor, entry.recomposition), entry);
		}
		found
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	#[cfg(test)]
	pub(crate) fn anchor_count(&self) -> usize {
		self.state.lock().anchors.len()
	}
}

#[async_trait]
impl StateReadStrategy for TrackAllStrategy {
	async fn get(&self, node: &ComposableNode, recomposition: u32) -> Option<Arc<StateReadEntry>> {
		let key = RecompositionKey::new(node.anchor, recomposition);
		if let Some(hit) = self.lookup(key) {
			trace!(anchor = %key.anchor, recomposition, "state read cache hit");
			return Some(hit);
		}

		let fetch = async {
			if let Some(hit) = self.lookup(key) {
				return Some(hit);
			}
			match fetch_state_reads(&*self.endpoint, key).await {
				Ok(response) => {
					let strings = StringTable::new(&response.strings);
					let entries = decode_recompositions(&strings, node.id, &response.recompositions);
					let found = self.store(node.id, key.anchor, entries, response.first_retained_recomposition, Some(recomposition));
					if found.is_none() {
						debug!(anchor = %key.anchor, recomposition, "agent does not retain this recomposition");
					}
					found
				}
				Err(err) => {
					warn!(anchor = %key.anchor, recomposition, error = %err, "failed to fetch state reads");
					None
				}
			}
		};

		self.scope.run(self.flights.run(key, fetch)).await.flatten()
	}

	async fn start_observing(&self, _node: Option<&ComposableNode>) {}

	fn handle_event(&self, event: &StateReadEvent) {
		let node = {
			let mut state = self.state.lock();
			let node = state.anchors.get(&event.anchor).and_then(|info| info.node);
			if node.is_none() {
				state.anchors.put(
					event.anchor,
					AnchorInfo {
						node: None,
						first_retained: event.first_retained_recomposition,
					},
				);
			}
			node
		};
		let Some(node) = node else {
			trace!(anchor = %event.anchor, "state reads for an unseen composable");
			return;
		};
		let strings = StringTable::new(&event.strings);
		let entries = decode_recompositions(&strings, node, &event.recompositions);
		self.store(node, event.anchor, entries, event.first_retained_recomposition, None);
	}

	fn first_retained_recomposition(&self, anchor: AnchorHash) -> Option<u32> {
		self.state.lock().anchors.peek(&anchor).map(|info| info.first_retained)
	}

	fn clear(&self) {
		let mut state = self.state.lock();
		state.entries.clear();
		state.anchors.clear();
	}
}
