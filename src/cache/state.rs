//! Immutable value published by the refresh cache.

// self
use crate::{_prelude::*, keyset::KeySet};

/// Key set currently exposed to readers, plus refresh bookkeeping.
///
/// A new value is built for every refresh and swapped in whole; existing values are never
/// mutated, so a snapshot stays internally consistent for as long as it is held.
#[derive(Clone, Debug, Default)]
pub struct PublishedSet {
	/// Federated key set served at the well-known endpoint.
	pub keys: Arc<KeySet>,
	/// Number of replaces applied before this value; zero for the initial empty set.
	pub generation: u64,
	/// UTC timestamp of the replace that published this value.
	pub refreshed_at: Option<DateTime<Utc>>,
}
impl PublishedSet {
	/// Initial value served before any refresh has completed.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Whether a refresh has ever been published.
	pub fn is_initial(&self) -> bool {
		self.generation == 0
	}

	/// Successor value carrying a freshly merged key set.
	pub fn successor(&self, keys: Arc<KeySet>, refreshed_at: DateTime<Utc>) -> Self {
		Self {
			keys,
			generation: self.generation.saturating_add(1),
			refreshed_at: Some(refreshed_at),
		}
	}
}
