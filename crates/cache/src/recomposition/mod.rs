//! Per-recomposition state-read cache.
//!
//! Two retention strategies, picked once per session from
//! [`StateReadMode`](crate::StateReadMode):
//!
//! - [`StateReadMode::TrackAll`]: the agent records reads of every composable;
//!   fetched recompositions are kept in a bounded LRU and may be evicted and
//!   fetched again at any time.
//! - [`StateReadMode::OnDemand`]: the agent records reads of the selected
//!   composable only; the cache holds that composable's recompositions and
//!   is reset on every selection change.

mod on_demand;
mod reads;
mod track_all;

use std::sync::Arc;

use async_trait::async_trait;
use scry_protocol::{AnchorHash, Command, ComposableNode, RemoteEndpoint, Response, StateReadEvent, StateReadsResponse};

pub use reads::{RecompositionKey, StateRead, StateReadEntry, TraceFrame};

use self::on_demand::OnDemandStrategy;
use self::track_all::TrackAllStrategy;
use crate::config::{InspectorSettings, StateReadMode};
use crate::scope::SessionScope;
use crate::{FetchError, Result};

/// Retention strategy behind [`RecompositionStateReadCache`].
#[async_trait]
pub(crate) trait StateReadStrategy: Send + Sync {
	async fn get(&self, node: &ComposableNode, recomposition: u32) -> Option<Arc<StateReadEntry>>;

	/// Selection changed; `None` deselects.
	async fn start_observing(&self, node: Option<&ComposableNode>);

	fn handle_event(&self, event: &StateReadEvent);

	fn first_retained_recomposition(&self, anchor: AnchorHash) -> Option<u32>;

	fn clear(&self);
}

/// State reads of composables, keyed by recomposition.
pub struct RecompositionStateReadCache {
	mode: StateReadMode,
	strategy: Box<dyn StateReadStrategy>,
}

impl RecompositionStateReadCache {
	pub fn new(endpoint: Arc<dyn RemoteEndpoint>, scope: SessionScope, settings: &InspectorSettings) -> Self {
		let strategy: Box<dyn StateReadStrategy> = match settings.state_reads {
			StateReadMode::TrackAll => Box::new(TrackAllStrategy::new(endpoint, scope, settings.track_all_capacity)),
			StateReadMode::OnDemand => Box::new(OnDemandStrategy::new(endpoint, scope)),
		};
		Self {
			mode: settings.state_reads,
			strategy,
		}
	}

	pub fn mode(&self) -> StateReadMode {
		self.mode
	}

	/// Returns the reads of one recomposition, fetching them if needed.
	///
	/// `None` means the reads are unavailable: not retained by the agent, the
	/// observed composable changed, or the session ended.
	pub async fn get(&self, node: &ComposableNode, recomposition: u32) -> Option<Arc<StateReadEntry>> {
		self.strategy.get(node, recomposition).await
	}

	/// Points observation at a newly selected composable.
	pub async fn on_selection_changed(&self, node: Option<&ComposableNode>) {
		self.strategy.start_observing(node).await;
	}

	/// Feeds a pushed state-read event into the cache.
	pub fn handle_event(&self, event: &StateReadEvent) {
		self.strategy.handle_event(event);
	}

	/// Earliest recomposition of `node` the agent still retains, if known.
	pub fn first_retained_recomposition(&self, node: &ComposableNode) -> Option<u32> {
		self.strategy.first_retained_recomposition(node.anchor)
	}

	pub fn clear(&self) {
		self.strategy.clear();
	}
}

pub(crate) async fn fetch_state_reads(endpoint: &dyn RemoteEndpoint, key: RecompositionKey) -> Result<StateReadsResponse> {
	tracing::debug!(anchor = %key.anchor, recomposition = key.recomposition, "fetching state reads");
	let command = Command::GetRecompositionStateReads {
		anchor: key.anchor,
		recomposition: key.recomposition,
	};
	match endpoint.send(command).await? {
		Response::StateReads(response) => Ok(response),
		_ => Err(FetchError::UnexpectedResponse {
			command: "get_recomposition_state_reads",
		}),
	}
}
