//! HTTP client integration for upstream JWKS retrieval.

// crates.io
use http::header::ACCEPT;
use reqwest::{Client, Response, redirect::Policy};
use url::Url;
// self
use crate::{_prelude::*, keyset::KeySet};

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default size guard (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;
/// Longest prefix of a non-2xx body kept for diagnostics.
pub const MAX_ERROR_BODY_BYTES: usize = 512;
/// Maximum redirect depth.
pub const MAX_REDIRECTS: usize = 10;

/// Limits applied to every upstream fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
	/// Deadline for one request, covering connect, headers, and body.
	pub timeout: Duration,
	/// Maximum accepted body size in bytes.
	pub max_response_bytes: u64,
}
impl FetchPolicy {
	/// Validate invariants for fetch configuration.
	pub fn validate(&self) -> Result<()> {
		if self.timeout.is_zero() {
			return Err(Error::Validation {
				field: "fetch_timeout",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}

		Ok(())
	}
}
impl Default for FetchPolicy {
	fn default() -> Self {
		Self { timeout: DEFAULT_FETCH_TIMEOUT, max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES }
	}
}

/// Build the shared reqwest client used for every upstream.
pub fn build_client() -> Result<Client> {
	let client = Client::builder()
		.redirect(Policy::limited(MAX_REDIRECTS))
		.user_agent(format!("jwks-federation/{}", env!("CARGO_PKG_VERSION")))
		.connect_timeout(Duration::from_secs(5))
		.build()?;

	Ok(client)
}

/// Fetch and parse one upstream JWKS document.
///
/// Transport failures, timeouts, non-2xx statuses, oversized bodies, and undecodable bodies are all
/// reported as errors. Nothing is cached or retried.
pub async fn fetch_jwks(client: &Client, url: &Url, policy: &FetchPolicy) -> Result<KeySet> {
	let start = Instant::now();
	let response = client
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.timeout(policy.timeout)
		.send()
		.await?;
	let status = response.status();

	if !status.is_success() {
		let body = read_capped(response, MAX_ERROR_BODY_BYTES).await.ok().map(|body| {
			let mut text = String::from_utf8_lossy(&body.bytes).into_owned();

			if body.truncated {
				text.push_str("...");
			}

			text
		});

		return Err(Error::HttpStatus { status, url: url.clone(), body });
	}
	if let Some(length) = response.content_length()
		&& length > policy.max_response_bytes
	{
		return Err(oversized(policy.max_response_bytes));
	}

	let limit = usize::try_from(policy.max_response_bytes).unwrap_or(usize::MAX);
	let body = read_capped(response, limit).await?;

	if body.truncated {
		return Err(oversized(policy.max_response_bytes));
	}

	let jwks: KeySet = serde_json::from_slice(&body.bytes)?;

	tracing::debug!(
		url = %url,
		status = %status,
		keys = jwks.len(),
		elapsed = ?start.elapsed(),
		"jwks fetch complete"
	);

	Ok(jwks)
}

struct CappedBody {
	bytes: Vec<u8>,
	truncated: bool,
}

// Stops reading as soon as `limit` is exceeded; the rest of the body is never buffered.
async fn read_capped(mut response: Response, limit: usize) -> Result<CappedBody> {
	let mut bytes = Vec::new();

	while let Some(chunk) = response.chunk().await? {
		let room = limit - bytes.len();

		if chunk.len() > room {
			bytes.extend_from_slice(&chunk[..room]);

			return Ok(CappedBody { bytes, truncated: true });
		}

		bytes.extend_from_slice(&chunk);
	}

	Ok(CappedBody { bytes, truncated: false })
}

fn oversized(limit: u64) -> Error {
	Error::Validation {
		field: "max_response_bytes",
		reason: format!("Response body exceeds the configured guard of {limit} bytes."),
	}
}
