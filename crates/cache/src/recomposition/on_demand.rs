//! Observation of the selected composable only.
//!
//! # Concurrency
//!
//! One `Mutex` guards the observed composable, the cached recompositions, the
//! retention bound and the first-data signal, so a selection change can never
//! interleave with an insert. Remote round-trips run unlocked and their results
//! are re-validated against the observed composable before install.
//!
//! Selection switches are serialised by an async `switching` lock held from the
//! state reset through the tracking command, so the agent sees switches in the
//! order the cache applied them.
//!
//! A `get` whose recomposition has not happened yet may wait for the first
//! pushed reads, but only while the cache for the observed composable is still
//! empty; it gives up as soon as the selection changes or the session ends.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scry_protocol::{
	AnchorHash, Command, ComposableNode, NodeIdentity, RawRecompositionReads, RemoteEndpoint, Response, StateReadEvent, StringTable,
};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, trace, warn};

use super::reads::decode_recompositions;
use super::{RecompositionKey, StateReadEntry, StateReadStrategy, fetch_state_reads};
use crate::flight::SingleFlight;
use crate::scope::SessionScope;

/// Published when the observed composable gets its first cached recomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FirstData {
	anchor: AnchorHash,
	recomposition: u32,
}

struct ObservedState {
	observed: Option<ComposableNode>,
	entries: HashMap<u32, Arc<StateReadEntry>>,
	first_retained: Option<u32>,
	first_data: watch::Sender<Option<FirstData>>,
}

impl ObservedState {
	fn is_observing(&self, anchor: AnchorHash) -> bool {
		self.observed.is_some_and(|node| node.anchor == anchor)
	}

	fn lookup(&self, key: RecompositionKey) -> Option<Arc<StateReadEntry>> {
		if !self.is_observing(key.anchor) {
			return None;
		}
		self.entries.get(&key.recomposition).cloned()
	}

	/// Drops everything cached for the previous target and wakes its waiters.
	fn reset(&mut self, observed: Option<ComposableNode>) {
		self.observed = observed;
		self.entries.clear();
		self.first_retained = None;
		self.first_data.send_replace(None);
	}

	/// Caller must have checked `is_observing(anchor)`.
	fn insert(&mut self, anchor: AnchorHash, entries: Vec<StateReadEntry>, first_retained: u32) {
		let was_empty = self.entries.is_empty();
		self.first_retained = Some(first_retained);
		for entry in entries {
			self.entries.insert(entry.recomposition, Arc::new(entry));
		}
		if was_empty && let Some(&recomposition) = self.entries.keys().min() {
			debug!(anchor = %anchor, recomposition, "first state reads for observed composable");
			self.first_data.send_replace(Some(FirstData { anchor, recomposition }));
		}
	}
}

/// Caches recompositions of the observed composable only.
pub(crate) struct OnDemandStrategy {
	endpoint: Arc<dyn RemoteEndpoint>,
	scope: SessionScope,
	state: Mutex<ObservedState>,
	switching: AsyncMutex<()>,
	flights: SingleFlight<RecompositionKey, Arc<StateReadEntry>>,
}

impl OnDemandStrategy {
	pub(crate) fn new(endpoint: Arc<dyn RemoteEndpoint>, scope: SessionScope) -> Self {
		let (first_data, _) = watch::channel(None);
		Self {
			endpoint,
			scope,
			state: Mutex::new(ObservedState {
				observed: None,
				entries: HashMap::new(),
				first_retained: None,
				first_data,
			}),
			switching: AsyncMutex::new(()),
			flights: SingleFlight::new(),
		}
	}

	fn lookup(&self, key: RecompositionKey) -> Option<Arc<StateReadEntry>> {
		self.state.lock().lookup(key)
	}

	/// Installs reads if `anchor` is still observed; returns the one at `key`.
	fn install(&self, node: NodeIdentity, anchor: AnchorHash, strings: &StringTable, raws: &[RawRecompositionReads], first_retained: u32, key: Option<RecompositionKey>) -> Option<Arc<StateReadEntry>> {
		let entries = decode_recompositions(strings, node, raws);
		let mut state = self.state.lock();
		if !state.is_observing(anchor) {
			debug!(anchor = %anchor, "discarding state reads for a composable no longer observed");
			return None;
		}
		state.insert(anchor, entries, first_retained);
		key.and_then(|key| state.lookup(key))
	}

	async fn fetch_or_wait(&self, node: &ComposableNode, key: RecompositionKey) -> Option<Arc<StateReadEntry>> {
		let (mut first_data, was_empty) = {
			let state = self.state.lock();
			if !state.is_observing(key.anchor) {
				debug!(anchor = %key.anchor, "state reads requested for a composable that is not observed");
				return None;
			}
			if let Some(hit) = state.lookup(key) {
				return Some(hit);
			}
			(state.first_data.subscribe(), state.entries.is_empty())
		};

		let response = match fetch_state_reads(&*self.endpoint, key).await {
			Ok(response) => response,
			Err(err) => {
				warn!(anchor = %key.anchor, recomposition = key.recomposition, error = %err, "failed to fetch state reads");
				return None;
			}
		};
		let strings = StringTable::new(&response.strings);
		if response.anchor != key.anchor {
			debug!(anchor = %key.anchor, got = %response.anchor, "state reads for a different composable");
			return None;
		}
		if let Some(hit) = self.install(node.id, key.anchor, &strings, &response.recompositions, response.first_retained_recomposition, Some(key)) {
			return Some(hit);
		}
		if !was_empty {
			trace!(anchor = %key.anchor, recomposition = key.recomposition, "recomposition not retained");
			return None;
		}

		// Nothing recorded yet: wait for the first pushed reads of this composable.
		if first_data.changed().await.is_err() {
			return None;
		}
		let state = self.state.lock();
		let signalled = *first_data.borrow_and_update();
		match signalled {
			Some(first) if first.anchor == key.anchor && state.is_observing(key.anchor) => state.lookup(key),
			_ => {
				debug!(anchor = %key.anchor, "observation target changed while waiting for state reads");
				None
			}
		}
	}
}

#[async_trait]
impl StateReadStrategy for OnDemandStrategy {
	async fn get(&self, node: &ComposableNode, recomposition: u32) -> Option<Arc<StateReadEntry>> {
		let key = RecompositionKey::new(node.anchor, recomposition);
		if let Some(hit) = self.lookup(key) {
			trace!(anchor = %key.anchor, recomposition, "state read cache hit");
			return Some(hit);
		}
		self.scope.run(self.flights.run(key, self.fetch_or_wait(node, key))).await.flatten()
	}

	async fn start_observing(&self, node: Option<&ComposableNode>) {
		let Some(_switching) = self.scope.run(self.switching.lock()).await else {
			return;
		};
		let command = {
			let mut state = self.state.lock();
			let anchor = node.map(|n| n.anchor);
			if state.observed.map(|n| n.anchor) == anchor {
				return;
			}
			state.reset(node.copied());
			match anchor {
				Some(anchor) => Command::StartTrackingStateReads { anchor },
				None => Command::StopTrackingStateReads,
			}
		};

		debug!(command = command.name(), "switching observed composable");
		match self.scope.run(self.endpoint.send(command)).await {
			Some(Ok(Response::Ack)) | None => {}
			Some(Ok(Response::UnknownCommand)) => debug!("agent does not support state read tracking"),
			Some(Ok(other)) => warn!(response = ?other, "unexpected reply to tracking command"),
			Some(Err(err)) => warn!(error = %err, "failed to switch observed composable"),
		}
	}

	fn handle_event(&self, event: &StateReadEvent) {
		let node = self.state.lock().observed.filter(|n| n.anchor == event.anchor);
		let Some(node) = node else {
			debug!(anchor = %event.anchor, "discarding state reads for a composable no longer observed");
			return;
		};
		let strings = StringTable::new(&event.strings);
		self.install(node.id, event.anchor, &strings, &event.recompositions, event.first_retained_recomposition, None);
	}

	fn first_retained_recomposition(&self, anchor: AnchorHash) -> Option<u32> {
		let state = self.state.lock();
		if !state.is_observing(anchor) {
			return None;
		}
		state.first_retained
	}

	fn clear(&self) {
		self.state.lock().reset(None);
	}
}
