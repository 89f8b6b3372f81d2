//! Concurrency-safe holder of the published key set.

// crates.io
use tokio::sync::RwLock;
// self
use crate::{_prelude::*, cache::state::PublishedSet, keyset::KeySet};

/// Shared handle to the currently published key set.
///
/// Readers take an [`Arc`] snapshot under a read lock held only for the clone; writers build the
/// successor value first and hold the write lock only for the pointer swap. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct RefreshCache {
	current: Arc<RwLock<Arc<PublishedSet>>>,
}
impl RefreshCache {
	/// Create a cache holding the initial empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current published value.
	///
	/// Returns the initial empty set until the first [`replace`](Self::replace).
	pub async fn snapshot(&self) -> Arc<PublishedSet> {
		self.current.read().await.clone()
	}

	/// Atomically publish a new key set, returning its generation.
	pub async fn replace(&self, keys: KeySet) -> u64 {
		let keys = Arc::new(keys);
		let refreshed_at = Utc::now();
		let mut current = self.current.write().await;
		let next = Arc::new(current.successor(keys, refreshed_at));
		let generation = next.generation;
		let previous = std::mem::replace(&mut *current, next);

		drop(current);
		// The old value is released outside the lock; readers may still hold it.
		drop(previous);

		generation
	}
}
