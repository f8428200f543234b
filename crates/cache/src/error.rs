/// A convenient type alias for `Result` with `E` = [`FetchError`].
pub type Result<T, E = FetchError> = std::result::Result<T, E>;

/// Why a remote fetch produced no data.
///
/// Public cache accessors never return this; they log it and degrade to "no data".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
	/// The endpoint failed.
	#[error("{0}")]
	Remote(#[from] scry_protocol::Error),
	/// The session was torn down while waiting.
	#[error("session cancelled")]
	Cancelled,
	/// The agent answered with a reply that does not belong to the command.
	#[error("unexpected reply to {command}")]
	UnexpectedResponse {
		/// Name of the command that was sent.
		command: &'static str,
	},
}
