//! Background loop driving periodic refresh cycles.
//!
//! The loop is sequential: a cycle fully completes before the next sleep begins, so cycles never
//! overlap. Cancellation is observed between cycles and during the sleep.

// crates.io
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, cache::manager::FederationManager};

/// When the first cycle runs relative to the loop start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstCycle {
	/// Refresh as soon as the loop starts, then every interval.
	Immediate,
	/// Wait one interval first; used when the caller already ran the startup cycle.
	Delayed,
}

/// Fixed-interval refresh schedule bound to a [`FederationManager`].
#[derive(Clone, Debug)]
pub struct RefreshLoop {
	manager: FederationManager,
	interval: Duration,
}
impl RefreshLoop {
	/// Create a loop refreshing every `interval`; a zero interval is rejected.
	pub fn new(manager: FederationManager, interval: Duration) -> Result<Self> {
		if interval.is_zero() {
			return Err(Error::Config {
				field: "update_interval",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(Self { manager, interval })
	}

	/// Configured sleep between cycles.
	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Run until `cancel` fires.
	#[tracing::instrument(skip_all, name = "refresh_loop", fields(interval = ?self.interval))]
	pub async fn run(self, cancel: CancellationToken, first: FirstCycle) {
		tracing::info!(?first, "starting refresh loop");

		if first == FirstCycle::Immediate && !cancel.is_cancelled() {
			self.manager.refresh().await;
		}

		loop {
			tokio::select! {
				_ = cancel.cancelled() => {
					tracing::info!("refresh loop received shutdown signal, exiting");

					break;
				}
				_ = time::sleep(self.interval) => {
					self.manager.refresh().await;
				}
			}
		}
	}

	/// Spawn [`run`](Self::run) onto the current runtime.
	pub fn spawn(self, cancel: CancellationToken, first: FirstCycle) -> JoinHandle<()> {
		tokio::spawn(self.run(cancel, first))
	}
}
