//! Service configuration.
//!
//! Values come from an optional YAML file and from `JWKS_FEDERATION_*` environment variables;
//! environment values override file values. A missing default config file is fine, a malformed
//! one or an unparsable duration is fatal.

// std
use std::{
	collections::HashMap,
	env, fs,
	path::{Path, PathBuf},
};
// crates.io
use serde::Deserialize;
use url::Url;
// self
use crate::{_prelude::*, http::client::FetchPolicy, merge::AllowList};

/// Prefix shared by every environment variable.
pub const ENV_PREFIX: &str = "JWKS_FEDERATION_";
/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "JWKS_FEDERATION_CONFIG";
/// File names probed in the working directory when no explicit path is set.
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["config.yaml", "config.yml"];
/// Default refresh interval.
pub const DEFAULT_UPDATE_INTERVAL: &str = "1h";
/// Default listen address; a leading `:` binds every interface.
pub const DEFAULT_LISTEN_ADDR: &str = ":8080";

/// Raw values read from the YAML config file. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	/// Upstream JWKS endpoints in merge order.
	pub upstream_jwks_urls: Option<Vec<String>>,
	/// Permitted key ids; empty permits all.
	pub allowed_kids: Option<Vec<String>>,
	/// Refresh interval such as `1h` or `15m`.
	pub update_interval: Option<String>,
	/// Socket address for the HTTP listener.
	pub listen_addr: Option<String>,
	/// Per-upstream request timeout.
	pub fetch_timeout: Option<String>,
	/// Maximum accepted upstream body size in bytes.
	pub max_response_bytes: Option<u64>,
}
impl FileConfig {
	/// Parse YAML text; an empty document yields all defaults.
	pub fn from_yaml(raw: &str) -> Result<Self> {
		if raw.trim().is_empty() {
			return Ok(Self::default());
		}

		Ok(serde_yaml::from_str(raw)?)
	}

	/// Read and parse the file at `path`.
	pub fn read(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)?;

		Self::from_yaml(&raw)
	}

	/// Locate and read the config file.
	///
	/// An explicit [`CONFIG_PATH_VAR`] must exist. Otherwise [`DEFAULT_CONFIG_FILES`] are probed in
	/// `base`, and finding none is not an error.
	pub fn discover(
		base: &Path,
		vars: &HashMap<String, String>,
	) -> Result<Option<(PathBuf, Self)>> {
		if let Some(explicit) = vars.get(CONFIG_PATH_VAR).filter(|value| !value.trim().is_empty()) {
			let path = PathBuf::from(explicit.trim());
			let file = Self::read(&path)?;

			return Ok(Some((path, file)));
		}

		for name in DEFAULT_CONFIG_FILES {
			let path = base.join(name);

			if path.is_file() {
				let file = Self::read(&path)?;

				return Ok(Some((path, file)));
			}
		}

		Ok(None)
	}
}

/// Fully resolved service configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
	/// Upstream JWKS endpoints in merge order.
	pub upstream_jwks_urls: Vec<Url>,
	/// Permitted key ids; empty permits all.
	pub allowed_kids: Vec<String>,
	/// Sleep between refresh cycles.
	pub update_interval: Duration,
	/// Address handed to the TCP listener.
	pub listen_addr: String,
	/// Limits applied to each upstream fetch.
	pub fetch: FetchPolicy,
	/// Config file the values were read from, if any.
	pub config_file: Option<PathBuf>,
}
impl Config {
	/// Load configuration from the working directory and the process environment.
	pub fn load() -> Result<Self> {
		let vars: HashMap<String, String> = env::vars().collect();
		let base = env::current_dir()?;

		Self::from_sources(FileConfig::discover(&base, &vars)?, &vars)
	}

	/// Merge file values with environment overrides and validate the result.
	pub fn from_sources(
		file: Option<(PathBuf, FileConfig)>,
		vars: &HashMap<String, String>,
	) -> Result<Self> {
		let (config_file, file) = match file {
			Some((path, file)) => (Some(path), file),
			None => (None, FileConfig::default()),
		};
		let upstream_jwks_urls = env_list(vars, "UPSTREAM_JWKS_URLS")
			.or(file.upstream_jwks_urls)
			.unwrap_or_default()
			.iter()
			.map(|raw| parse_url(raw))
			.collect::<Result<Vec<_>>>()?;
		let allowed_kids = env_list(vars, "ALLOWED_KIDS")
			.or(file.allowed_kids)
			.unwrap_or_default()
			.into_iter()
			.map(|kid| kid.trim().to_string())
			.filter(|kid| !kid.is_empty())
			.collect();
		let update_interval = parse_duration(
			"update_interval",
			&env_value(vars, "UPDATE_INTERVAL")
				.or(file.update_interval)
				.unwrap_or_else(|| DEFAULT_UPDATE_INTERVAL.into()),
		)?;
		let listen_addr = normalize_listen_addr(
			&env_value(vars, "LISTEN_ADDR")
				.or(file.listen_addr)
				.unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into()),
		)?;
		let mut fetch = FetchPolicy::default();

		if let Some(raw) = env_value(vars, "FETCH_TIMEOUT").or(file.fetch_timeout) {
			fetch.timeout = parse_duration("fetch_timeout", &raw)?;
		}
		if let Some(raw) = env_value(vars, "MAX_RESPONSE_BYTES") {
			fetch.max_response_bytes = raw.trim().parse().map_err(|err| Error::Config {
				field: "max_response_bytes",
				reason: format!("Expected a byte count, got '{raw}': {err}."),
			})?;
		} else if let Some(bytes) = file.max_response_bytes {
			fetch.max_response_bytes = bytes;
		}

		fetch.validate().map_err(|err| match err {
			Error::Validation { field, reason } => Error::Config { field, reason },
			other => other,
		})?;

		Ok(Self {
			upstream_jwks_urls,
			allowed_kids,
			update_interval,
			listen_addr,
			fetch,
			config_file,
		})
	}

	/// Allow-list built from [`Config::allowed_kids`].
	pub fn allow_list(&self) -> AllowList {
		AllowList::new(self.allowed_kids.iter().cloned())
	}
}

// Blank values count as unset so file values and defaults still apply.
fn env_value(vars: &HashMap<String, String>, key: &str) -> Option<String> {
	vars.get(&format!("{ENV_PREFIX}{key}")).filter(|value| !value.trim().is_empty()).cloned()
}

// Lists may be separated by commas, whitespace, or both.
fn env_list(vars: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
	env_value(vars, key).map(|raw| {
		raw.split(|c: char| c == ',' || c.is_whitespace())
			.filter(|item| !item.is_empty())
			.map(str::to_string)
			.collect()
	})
}

fn parse_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw.trim()).map_err(|err| Error::Config {
		field: "upstream_jwks_urls",
		reason: format!("Invalid URL '{raw}': {err}."),
	})?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(Error::Config {
			field: "upstream_jwks_urls",
			reason: format!("URL '{url}' must use http or https."),
		});
	}

	Ok(url)
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration> {
	let duration = humantime::parse_duration(raw.trim()).map_err(|err| Error::Config {
		field,
		reason: format!("Invalid duration '{raw}': {err}."),
	})?;

	if duration.is_zero() {
		return Err(Error::Config { field, reason: "Must be greater than zero.".into() });
	}

	Ok(duration)
}

fn normalize_listen_addr(raw: &str) -> Result<String> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Err(Error::Config { field: "listen_addr", reason: "Must not be empty.".into() });
	}

	if trimmed.starts_with(':') {
		Ok(format!("[::]{trimmed}"))
	} else {
		Ok(trimmed.to_string())
	}
}
