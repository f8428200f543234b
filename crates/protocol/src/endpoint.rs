//! Boundary to the transport that reaches the inspected process.

use async_trait::async_trait;

use crate::Result;
use crate::message::{Command, Response};

/// Request/reply channel to the agent running inside the inspected process.
///
/// Implementations own framing, serialization and process attach. Commands are
/// idempotent to re-send, and a reply may legitimately carry "no data yet" instead
/// of an error. Retry policy, if any, belongs here rather than in the caches.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
	/// Sends one command and waits for its reply.
	async fn send(&self, command: Command) -> Result<Response>;
}
