//! Transport-level errors surfaced by a [`RemoteEndpoint`](crate::RemoteEndpoint).

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible endpoint errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The inspected process is gone or the connection was closed.
	#[error("endpoint disconnected")]
	Disconnected,
	/// The transport failed to deliver a command or read its reply.
	#[error("transport error: {0}")]
	Transport(String),
}
