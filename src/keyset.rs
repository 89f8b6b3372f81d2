//! JWKS document model shared by upstream fetches and the published endpoint.
//!
//! Entries are algorithm-agnostic: RSA and EC members live side by side on [`KeyEntry`], and any
//! member this crate does not name is preserved verbatim in [`KeyEntry::extra`]. Nothing beyond
//! `kid` is interpreted.

// crates.io
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Ordered collection of key entries in the JWKS wire shape `{"keys": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
	/// Key entries in upstream (or merge) order.
	#[serde(default, deserialize_with = "deserialize_keys")]
	pub keys: Vec<KeyEntry>,
}
impl KeySet {
	/// Create an empty key set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of entries in the set.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the set carries no entries.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Iterate over the entries in order.
	pub fn iter(&self) -> std::slice::Iter<'_, KeyEntry> {
		self.keys.iter()
	}

	/// First entry carrying the given key id.
	pub fn find(&self, kid: &str) -> Option<&KeyEntry> {
		self.keys.iter().find(|entry| entry.kid.as_deref() == Some(kid))
	}

	/// Key ids in order; entries without a `kid` are skipped.
	pub fn kids(&self) -> Vec<&str> {
		self.keys.iter().filter_map(|entry| entry.kid.as_deref()).collect()
	}
}
impl FromIterator<KeyEntry> for KeySet {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = KeyEntry>,
	{
		Self { keys: iter.into_iter().collect() }
	}
}
impl IntoIterator for KeySet {
	type IntoIter = std::vec::IntoIter<KeyEntry>;
	type Item = KeyEntry;

	fn into_iter(self) -> Self::IntoIter {
		self.keys.into_iter()
	}
}

/// A single public key descriptor.
///
/// Absent members stay absent on serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
	/// Key identifier used for allow-listing.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
	/// Key type (`RSA`, `EC`, or anything else passed through).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kty: Option<String>,
	/// Intended algorithm.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alg: Option<String>,
	/// Public key use (`sig`, `enc`).
	#[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
	pub r#use: Option<String>,
	/// RSA modulus.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub n: Option<String>,
	/// RSA public exponent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub e: Option<String>,
	/// EC curve name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub crv: Option<String>,
	/// EC x coordinate.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<String>,
	/// EC y coordinate.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<String>,
	/// Every other member (`x5c`, `key_ops`, ...), kept as received.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl KeyEntry {
	/// Create an entry carrying only a key id and key type.
	pub fn new(kid: impl Into<String>, kty: impl Into<String>) -> Self {
		Self { kid: Some(kid.into()), kty: Some(kty.into()), ..Default::default() }
	}
}

// Upstreams written in languages with nil slices publish `"keys": null` for an empty set.
fn deserialize_keys<'de, D>(deserializer: D) -> std::result::Result<Vec<KeyEntry>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Vec<KeyEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
