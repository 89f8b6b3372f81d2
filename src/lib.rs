//! Federates the JSON Web Key Sets of several identity providers into one allow-listed key set
//! and republishes it at `/.well-known/jwks.json`.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod config;
pub mod http;
pub mod keyset;
pub mod merge;
pub mod scheduler;
pub mod server;
pub mod telemetry;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

pub use crate::{
	cache::{
		manager::{CycleState, FederationManager, RefreshSummary},
		state::PublishedSet,
		store::RefreshCache,
	},
	config::Config,
	error::{Error, Result},
	http::client::FetchPolicy,
	keyset::{KeyEntry, KeySet},
	merge::{AllowList, UpstreamFetch, merge_and_filter},
	scheduler::{FirstCycle, RefreshLoop},
	server::JWKS_PATH,
};
