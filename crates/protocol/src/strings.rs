//! Per-message string pool.
//!
//! Every payload refers to names and textual values by integer id. The table is
//! built fresh from each response or event and never shared between messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of a message's string pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEntry {
	/// Pool id referenced by the payload.
	pub id: i32,
	/// Resolved text.
	pub text: String,
}

impl StringEntry {
	/// Creates a pool entry.
	pub fn new(id: i32, text: impl Into<String>) -> Self {
		Self { id, text: text.into() }
	}
}

/// Lookup table from pool id to text.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
	strings: HashMap<i32, String>,
}

impl StringTable {
	/// Builds a table from a message's pool entries.
	pub fn new(entries: &[StringEntry]) -> Self {
		Self {
			strings: entries.iter().map(|e| (e.id, e.text.clone())).collect(),
		}
	}

	/// Resolves an id, yielding an empty string for ids missing from the pool.
	pub fn get(&self, id: i32) -> &str {
		self.strings.get(&id).map(String::as_str).unwrap_or("")
	}

	/// Number of pooled strings.
	pub fn len(&self) -> usize {
		self.strings.len()
	}

	/// Returns true if the pool is empty.
	pub fn is_empty(&self) -> bool {
		self.strings.is_empty()
	}
}
