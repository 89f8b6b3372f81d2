//! Federation manager running fetch, merge, and publish cycles.

// crates.io
use reqwest::Client;
use tokio::sync::Mutex;
use url::Url;
// self
use crate::{
	_prelude::*,
	cache::{state::PublishedSet, store::RefreshCache},
	http::client::{self, FetchPolicy},
	merge::{AllowList, UpstreamFetch, merge_and_filter},
};

/// Whether a refresh cycle is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
	/// No cycle in progress.
	Idle,
	/// A cycle is fetching, merging, or publishing.
	Refreshing,
}

/// Outcome of one completed refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshSummary {
	/// Generation published by the cycle.
	pub generation: u64,
	/// Number of configured upstreams.
	pub upstreams: usize,
	/// Upstreams whose fetch failed this cycle.
	pub failed: usize,
	/// Entries in the published key set.
	pub published: usize,
	/// Wall-clock duration of the cycle.
	pub elapsed: Duration,
}

/// Coordinates fetching every upstream and publishing the merged result.
///
/// Cycles are serialised by a single-flight guard, so concurrent callers of
/// [`refresh`](Self::refresh) run one after another rather than overlapping.
#[derive(Clone, Debug)]
pub struct FederationManager {
	upstreams: Arc<[Url]>,
	allow_list: Arc<AllowList>,
	policy: FetchPolicy,
	client: Client,
	cache: RefreshCache,
	single_flight: Arc<Mutex<()>>,
}
impl FederationManager {
	/// Build a manager with the default reqwest client.
	pub fn new(upstreams: Vec<Url>, allow_list: AllowList, policy: FetchPolicy) -> Result<Self> {
		policy.validate()?;

		let client = client::build_client()?;

		Ok(Self::with_client(upstreams, allow_list, policy, client))
	}

	/// Build a manager using the supplied HTTP client (primarily for tests).
	pub fn with_client(
		upstreams: Vec<Url>,
		allow_list: AllowList,
		policy: FetchPolicy,
		client: Client,
	) -> Self {
		Self {
			upstreams: upstreams.into(),
			allow_list: Arc::new(allow_list),
			policy,
			client,
			cache: RefreshCache::new(),
			single_flight: Arc::new(Mutex::new(())),
		}
	}

	/// Cache handle shared with the publish endpoint.
	pub fn cache(&self) -> RefreshCache {
		self.cache.clone()
	}

	/// Configured upstream endpoints in merge order.
	pub fn upstreams(&self) -> &[Url] {
		&self.upstreams
	}

	/// Currently published value.
	pub async fn snapshot(&self) -> Arc<PublishedSet> {
		self.cache.snapshot().await
	}

	/// Report whether a cycle is in progress.
	pub fn cycle_state(&self) -> CycleState {
		match self.single_flight.try_lock() {
			Ok(_) => CycleState::Idle,
			Err(_) => CycleState::Refreshing,
		}
	}

	/// Run one full cycle: fetch every upstream in order, merge, then publish.
	///
	/// Upstream failures only shrink the merged set; the cycle itself always publishes.
	#[tracing::instrument(skip(self), fields(upstreams = self.upstreams.len()))]
	pub async fn refresh(&self) -> RefreshSummary {
		let _guard = self.single_flight.lock().await;
		let started = Instant::now();
		let mut fetched = Vec::with_capacity(self.upstreams.len());

		for url in self.upstreams.iter() {
			let outcome = client::fetch_jwks(&self.client, url, &self.policy).await;

			fetched.push(UpstreamFetch::new(url.clone(), outcome));
		}

		let failed = fetched.iter().filter(|upstream| upstream.outcome.is_err()).count();
		let merged = merge_and_filter(&fetched, &self.allow_list);
		let published = merged.len();
		let generation = self.cache.replace(merged).await;
		let summary = RefreshSummary {
			generation,
			upstreams: self.upstreams.len(),
			failed,
			published,
			elapsed: started.elapsed(),
		};

		if failed == summary.upstreams && failed > 0 {
			tracing::warn!(generation, failed, "every upstream failed; published an empty key set");
		} else {
			tracing::info!(
				generation,
				failed,
				keys = published,
				elapsed = ?summary.elapsed,
				"published federated key set"
			);
		}

		summary
	}
}
