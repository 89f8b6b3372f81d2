//! HTTP surface publishing the federated key set.

// std
use std::future::Future;
// crates.io
use axum::{
	Router,
	extract::State,
	http::{StatusCode, header::CONTENT_TYPE},
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{_prelude::*, cache::store::RefreshCache};

/// Well-known path the federated key set is served from.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Build the router exposing [`JWKS_PATH`] and nothing else.
pub fn router(cache: RefreshCache) -> Router {
	Router::new()
		.route(JWKS_PATH, get(publish_jwks))
		.with_state(cache)
		.layer(TraceLayer::new_for_http())
}

/// Bind the HTTP listener.
///
/// `[::]:<port>` listens on every interface; hosts without IPv6 fall back to `0.0.0.0:<port>`.
pub async fn bind(listen_addr: &str) -> Result<TcpListener> {
	match TcpListener::bind(listen_addr).await {
		Ok(listener) => Ok(listener),
		Err(err) => match listen_addr.strip_prefix("[::]:") {
			Some(port) => {
				tracing::warn!(error = %err, port, "IPv6 bind failed, listening on IPv4 only");

				Ok(TcpListener::bind(format!("0.0.0.0:{port}")).await?)
			},
			None => Err(err.into()),
		},
	}
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, cache: RefreshCache, shutdown: F) -> Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	if let Ok(addr) = listener.local_addr() {
		tracing::info!(%addr, path = JWKS_PATH, "jwks federation listening");
	}

	axum::serve(listener, router(cache)).with_graceful_shutdown(shutdown).await?;

	Ok(())
}

async fn publish_jwks(State(cache): State<RefreshCache>) -> Response {
	let published = cache.snapshot().await;

	match serde_json::to_vec(published.keys.as_ref()) {
		Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response(),
		Err(err) => {
			tracing::error!(
				error = %err,
				generation = published.generation,
				"failed to encode key set"
			);

			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		},
	}
}
