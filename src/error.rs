//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the JWKS federation crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),
	#[error(transparent)]
	Yaml(#[from] serde_yaml::Error),

	#[error("Invalid configuration for {field}: {reason}")]
	Config { field: &'static str, reason: String },
	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	#[error("Telemetry error: {0}")]
	Telemetry(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl From<tracing_subscriber::util::TryInitError> for Error {
	fn from(value: tracing_subscriber::util::TryInitError) -> Self {
		Self::Telemetry(value.to_string())
	}
}
