//! One inspection session: both caches, their shared scope, and event routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scry_protocol::{ComposableNode, Event, RemoteEndpoint};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{ConfigError, InspectorSettings};
use crate::node_cache::NodeParameterCache;
use crate::recomposition::RecompositionStateReadCache;
use crate::scope::SessionScope;

/// Errors from [`Session::spawn_event_router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpawnRouterError {
	#[error("event router requires a Tokio runtime")]
	NoRuntime,
	#[error("event router already started")]
	AlreadyStarted,
}

/// Caches bound to one connection with the inspection agent.
///
/// Dropping or disconnecting the session resolves every outstanding fetch and
/// wait to "no result".
pub struct Session {
	scope: SessionScope,
	parameters: Arc<NodeParameterCache>,
	state_reads: Arc<RecompositionStateReadCache>,
	router_started: AtomicBool,
}

impl Session {
	pub fn new(endpoint: Arc<dyn RemoteEndpoint>, settings: InspectorSettings) -> Result<Self, ConfigError> {
		settings.validate()?;
		let scope = SessionScope::new();
		Ok(Self {
			parameters: Arc::new(NodeParameterCache::new(endpoint.clone(), scope.child(), &settings)),
			state_reads: Arc::new(RecompositionStateReadCache::new(endpoint, scope.child(), &settings)),
			scope,
			router_started: AtomicBool::new(false),
		})
	}

	pub fn parameters(&self) -> &Arc<NodeParameterCache> {
		&self.parameters
	}

	pub fn state_reads(&self) -> &Arc<RecompositionStateReadCache> {
		&self.state_reads
	}

	pub fn scope(&self) -> &SessionScope {
		&self.scope
	}

	/// Applies one pushed event to the caches.
	pub fn handle_event(&self, event: &Event) {
		dispatch(&self.parameters, &self.state_reads, event);
	}

	/// Routes pushed events into the caches until the channel closes or the
	/// session is torn down.
	pub fn spawn_event_router(&self, mut events: mpsc::UnboundedReceiver<Event>) -> Result<JoinHandle<()>, SpawnRouterError> {
		if tokio::runtime::Handle::try_current().is_err() {
			return Err(SpawnRouterError::NoRuntime);
		}
		if self.router_started.swap(true, Ordering::SeqCst) {
			return Err(SpawnRouterError::AlreadyStarted);
		}

		let parameters = self.parameters.clone();
		let state_reads = self.state_reads.clone();
		let scope = self.scope.clone();
		Ok(tokio::spawn(async move {
			while let Some(Some(event)) = scope.run(events.recv()).await {
				dispatch(&parameters, &state_reads, &event);
			}
			debug!("event router stopped");
		}))
	}

	/// Selection changed in the view tree; `None` deselects.
	pub async fn on_selection_changed(&self, node: Option<&ComposableNode>) {
		self.state_reads.on_selection_changed(node).await;
	}

	/// A root was laid out again; its cached parameters are stale.
	pub fn on_layout_update(&self, root_id: i64, generation: u32) {
		self.parameters.on_layout_update(root_id, generation);
	}

	/// Ends the session: cancels outstanding work and empties both caches.
	pub fn disconnect(&self) {
		if self.scope.is_cancelled() {
			return;
		}
		self.scope.cancel();
		self.parameters.clear();
		self.state_reads.clear();
		info!("inspection session disconnected");
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.scope.cancel();
	}
}

fn dispatch(parameters: &NodeParameterCache, state_reads: &RecompositionStateReadCache, event: &Event) {
	match event {
		Event::StateReads(reads) => state_reads.handle_event(reads),
		Event::LayoutUpdate { root_id, generation } => parameters.on_layout_update(*root_id, *generation),
	}
}
