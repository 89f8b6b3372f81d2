//! Tracing subscriber installation.

// crates.io
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::_prelude::*;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "jwks_federation=info,tower_http=info";

/// Install the global fmt subscriber, honouring `RUST_LOG`.
pub fn init() -> Result<()> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).try_init()?;

	Ok(())
}
