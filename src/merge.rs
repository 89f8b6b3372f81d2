//! Allow-list filtering and ordered merging of upstream key sets.

// std
use std::collections::HashSet;
// crates.io
use url::Url;
// self
use crate::{
	_prelude::*,
	keyset::{KeyEntry, KeySet},
};

/// Permitted key identifiers.
///
/// An empty list permits every key id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowList {
	kids: HashSet<String>,
}
impl AllowList {
	/// Build an allow-list from configured key ids.
	///
	/// Ids are trimmed and blank entries are ignored.
	pub fn new<I, S>(kids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let kids = kids
			.into_iter()
			.map(Into::<String>::into)
			.map(|kid| kid.trim().to_string())
			.filter(|kid| !kid.is_empty())
			.collect();

		Self { kids }
	}

	/// Allow-list that permits every key id.
	pub fn allow_all() -> Self {
		Self::default()
	}

	/// Whether the list is empty and therefore permits everything.
	pub fn is_empty(&self) -> bool {
		self.kids.is_empty()
	}

	/// Number of configured key ids.
	pub fn len(&self) -> usize {
		self.kids.len()
	}

	/// Whether the entry may be published.
	///
	/// With a non-empty list, entries lacking a `kid` are rejected.
	pub fn permits(&self, entry: &KeyEntry) -> bool {
		if self.kids.is_empty() {
			return true;
		}

		entry.kid.as_deref().is_some_and(|kid| self.kids.contains(kid))
	}
}

/// Result of fetching one upstream, tagged with its URL.
#[derive(Debug)]
pub struct UpstreamFetch {
	/// Upstream JWKS endpoint.
	pub url: Url,
	/// Parsed key set or the reason the fetch failed.
	pub outcome: Result<KeySet>,
}
impl UpstreamFetch {
	/// Pair an upstream URL with its fetch outcome.
	pub fn new(url: Url, outcome: Result<KeySet>) -> Self {
		Self { url, outcome }
	}
}

/// Union the allowed entries of every successful fetch.
///
/// Output follows the order of `fetched`, then each upstream's own entry order. Failed fetches
/// are logged and contribute nothing. Duplicate key ids across upstreams are all kept.
pub fn merge_and_filter(fetched: &[UpstreamFetch], allow_list: &AllowList) -> KeySet {
	let mut merged = Vec::new();

	for upstream in fetched {
		match &upstream.outcome {
			Ok(jwks) => {
				let before = merged.len();

				merged.extend(jwks.iter().filter(|entry| allow_list.permits(entry)).cloned());

				tracing::debug!(
					url = %upstream.url,
					received = jwks.len(),
					accepted = merged.len() - before,
					"merged upstream key set"
				);
			},
			Err(err) => {
				tracing::warn!(
					url = %upstream.url,
					error = %err,
					"skipping upstream after fetch failure"
				);
			},
		}
	}

	KeySet { keys: merged }
}
