//! JWKS federation service entry point.

// std
use std::process::ExitCode;
// crates.io
use tokio::signal;
use tokio_util::sync::CancellationToken;
// self
use jwks_federation::{
	Config, FederationManager, FirstCycle, RefreshLoop, Result, server, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
	if let Err(err) = telemetry::init() {
		eprintln!("failed to initialise tracing: {err}");

		return ExitCode::FAILURE;
	}

	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			tracing::error!(error = %err, "jwks federation stopped with an error");

			ExitCode::FAILURE
		},
	}
}

async fn run() -> Result<()> {
	let config = Config::load()?;

	tracing::info!(
		config_file = ?config.config_file,
		upstreams = config.upstream_jwks_urls.len(),
		allowed_kids = config.allowed_kids.len(),
		update_interval = ?config.update_interval,
		listen_addr = %config.listen_addr,
		"configuration loaded"
	);

	let manager = FederationManager::new(
		config.upstream_jwks_urls.clone(),
		config.allow_list(),
		config.fetch.clone(),
	)?;
	let refresh_loop = RefreshLoop::new(manager.clone(), config.update_interval)?;

	// Publish once before accepting traffic.
	manager.refresh().await;

	let cancel = CancellationToken::new();
	let refresh_task = refresh_loop.spawn(cancel.clone(), FirstCycle::Delayed);
	let listener = server::bind(&config.listen_addr).await?;
	let served = server::serve(listener, manager.cache(), shutdown_signal()).await;

	cancel.cancel();

	if let Err(err) = refresh_task.await {
		tracing::warn!(error = %err, "refresh loop did not stop cleanly");
	}

	tracing::info!("jwks federation shutdown complete");

	served
}

async fn shutdown_signal() {
	let ctrl_c = async {
		match signal::ctrl_c().await {
			Ok(()) => tracing::info!("received SIGINT, starting graceful shutdown"),
			Err(err) => tracing::error!(error = %err, "failed to listen for SIGINT"),
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;

				tracing::info!("received SIGTERM, starting graceful shutdown");
			},
			Err(err) => {
				tracing::error!(error = %err, "failed to listen for SIGTERM");

				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
