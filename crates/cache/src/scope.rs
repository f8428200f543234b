//! Session-scoped cancellation.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Cancellation scope tied to the lifetime of one inspection session.
///
/// Every suspension in the caches runs through [`SessionScope::run`], so a
/// disconnect resolves outstanding fetches and waits to "no result" instead of
/// leaving them hanging.
#[derive(Debug, Clone, Default)]
pub struct SessionScope {
	cancel: CancellationToken,
}

impl SessionScope {
	/// Creates a live scope.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true once the session has been torn down.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Tears the session down.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when the session is torn down.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Creates a child scope cancelled together with this one.
	pub fn child(&self) -> Self {
		Self {
			cancel: self.cancel.child_token(),
		}
	}

	/// Drives `fut` unless the session is torn down first.
	pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => None,
			out = fut => Some(out),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_run_completes() {
		let scope = SessionScope::new();
		assert_eq!(scope.run(async { 7 }).await, Some(7));
	}

	#[tokio::test]
	async fn test_cancel_resolves_pending() {
		let scope = SessionScope::new();
		let child = scope.child();
		let waiter = tokio::spawn(async move { child.run(std::future::pending::<()>()).await });
		scope.cancel();
		assert_eq!(waiter.await.unwrap(), None);
		assert!(scope.is_cancelled());
	}
}
