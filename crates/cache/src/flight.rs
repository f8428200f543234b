//! Single-flight deduplication of remote fetches.
//!
//! The first caller for a key becomes the leader and performs the fetch; callers
//! arriving while it is outstanding wait on a `watch` channel and receive the
//! leader's result. A guard publishes "no result" and frees the slot if the leader
//! is dropped (cancelled) before finishing, so waiters never hang and the next
//! caller can retry.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum Flight<V> {
	Pending,
	Done(Option<V>),
}

type FlightMap<K, V> = Mutex<HashMap<K, watch::Receiver<Flight<V>>>>;

/// Per-key in-flight table.
pub(crate) struct SingleFlight<K, V> {
	inflight: FlightMap<K, V>,
}

impl<K, V> SingleFlight<K, V>
where
	K: Eq + Hash + Clone + std::fmt::Debug,
	V: Clone,
{
	pub(crate) fn new() -> Self {
		Self {
			inflight: Mutex::new(HashMap::new()),
		}
	}

	/// Runs `fetch` unless a fetch for `key` is already outstanding, in which case
	/// its result is shared.
	///
	/// `fetch` is only polled by the leader; followers drop it unpolled.
	pub(crate) async fn run<F>(&self, key: K, fetch: F) -> Option<V>
	where
		F: Future<Output = Option<V>>,
	{
		let leader = {
			let mut map = self.inflight.lock();
			match map.get(&key) {
				Some(rx) => Err(rx.clone()),
				None => {
					let (tx, rx) = watch::channel(Flight::Pending);
					map.insert(key.clone(), rx);
					Ok(tx)
				}
			}
		};

		match leader {
			Ok(tx) => {
				let guard = FlightGuard {
					key: Some(key),
					map: &self.inflight,
					tx,
				};
				let value = fetch.await;
				guard.complete(value)
			}
			Err(rx) => {
				tracing::trace!(key = ?key, "joining in-flight fetch");
				wait(rx).await
			}
		}
	}

	/// Number of outstanding fetches.
	pub(crate) fn in_flight(&self) -> usize {
		self.inflight.lock().len()
	}
}

async fn wait<V: Clone>(mut rx: watch::Receiver<Flight<V>>) -> Option<V> {
	loop {
		if let Flight::Done(value) = &*rx.borrow_and_update() {
			return value.clone();
		}
		if rx.changed().await.is_err() {
			return match &*rx.borrow() {
				Flight::Done(value) => value.clone(),
				Flight::Pending => None,
			};
		}
	}
}

/// Publishes the leader's outcome exactly once, on completion or on drop.
struct FlightGuard<'a, K: Eq + Hash, V> {
	key: Option<K>,
	map: &'a FlightMap<K, V>,
	tx: watch::Sender<Flight<V>>,
}

impl<K: Eq + Hash, V: Clone> FlightGuard<'_, K, V> {
	fn complete(mut self, value: Option<V>) -> Option<V> {
		self.finish(value.clone());
		value
	}

	fn finish(&mut self, value: Option<V>) {
		let Some(key) = self.key.take() else {
			return;
		};
		let mut map = self.map.lock();
		self.tx.send_replace(Flight::Done(value));
		map.remove(&key);
	}
}

impl<K: Eq + Hash, V> Drop for FlightGuard<'_, K, V> {
	fn drop(&mut self) {
		let Some(key) = self.key.take() else {
			return;
		};
		// Leader dropped mid-fetch: release waiters and free the slot for a retry.
		let mut map = self.map.lock();
		self.tx.send_replace(Flight::Done(None));
		map.remove(&key);
	}
}
