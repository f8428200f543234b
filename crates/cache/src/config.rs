//! Settings for an inspection session.

use serde::{Deserialize, Serialize};

/// How recomposition state reads are retained.
///
/// Chosen once per session; switching requires a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateReadMode {
	/// The agent records reads of every composable; the client caches what it asks for.
	TrackAll,
	/// The agent records reads of the selected composable only.
	#[default]
	OnDemand,
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InspectorSettings {
	/// Retention strategy for state reads.
	pub state_reads: StateReadMode,
	/// Number of elements requested for the first page of a composite value.
	pub max_initial_elements: usize,
	/// Number of recompositions kept by the track-all cache before evicting.
	pub track_all_capacity: usize,
}

/// Returns the default first-page size for composite values.
fn default_max_initial_elements() -> usize {
	5
}

/// Returns the default track-all cache capacity.
fn default_track_all_capacity() -> usize {
	512
}

impl Default for InspectorSettings {
	fn default() -> Self {
		Self {
			state_reads: StateReadMode::default(),
			max_initial_elements: default_max_initial_elements(),
			track_all_capacity: default_track_all_capacity(),
		}
	}
}

/// Errors from parsing settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The input is not valid settings TOML.
	#[error("invalid inspector settings: {0}")]
	Parse(#[from] toml::de::Error),
	/// A size setting is zero.
	#[error("'{0}' must be greater than zero")]
	ZeroSize(&'static str),
}

impl InspectorSettings {
	/// Parses settings from TOML, filling missing keys with defaults.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let settings: Self = toml::from_str(input)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Rejects settings the caches cannot work with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_initial_elements == 0 {
			return Err(ConfigError::ZeroSize("max-initial-elements"));
		}
		if self.track_all_capacity == 0 {
			return Err(ConfigError::ZeroSize("track-all-capacity"));
		}
		Ok(())
	}

	/// Sets the retention strategy.
	pub fn state_reads(mut self, mode: StateReadMode) -> Self {
		self.state_reads = mode;
		self
	}

	/// Sets the first-page size for composite values.
	pub fn max_initial_elements(mut self, count: usize) -> Self {
		self.max_initial_elements = count;
		self
	}

	/// Sets the track-all cache capacity.
	pub fn track_all_capacity(mut self, capacity: usize) -> Self {
		self.track_all_capacity = capacity;
		self
	}
}
