//! End-to-end refresh cycles against mock upstream identity providers.

// crates.io
use jwks_federation::{AllowList, FederationManager, FetchPolicy, KeySet};
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

const JWKS_PATH: &str = "/.well-known/jwks.json";
const JWKS_A: &str = r#"{
    "keys": [
        { "kid": "a1", "kty": "RSA", "alg": "RS256", "use": "sig", "n": "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA", "e": "AQAB" },
        { "kid": "a2", "kty": "RSA", "alg": "RS256", "use": "sig", "n": "ICEiIyQlJicoKSorLC0uLzAxMjM0NTY3ODk6Ozw9Pj8", "e": "AQAB" }
    ]
}"#;
const JWKS_B: &str = r#"{
    "keys": [
        { "kid": "b1", "kty": "EC", "alg": "ES256", "use": "sig", "crv": "P-256", "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU", "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0" }
    ]
}"#;

async fn upstream(body: &'static str) -> (MockServer, Url) {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(JWKS_PATH))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(body)
				.insert_header("content-type", "application/json"),
		)
		.mount(&server)
		.await;

	let url = Url::parse(&format!("{}{JWKS_PATH}", server.uri())).expect("mock url");

	(server, url)
}

fn manager(upstreams: Vec<Url>, allow_list: AllowList) -> FederationManager {
	FederationManager::new(upstreams, allow_list, FetchPolicy::default()).expect("manager")
}

#[tokio::test]
async fn allow_list_selects_keys_in_upstream_order() {
	let _ = tracing_subscriber::fmt::try_init();
	let (_a, url_a) = upstream(JWKS_A).await;
	let (_b, url_b) = upstream(JWKS_B).await;
	let manager = manager(vec![url_a, url_b], AllowList::new(["b1", "a1"]));

	manager.refresh().await;

	let published = manager.snapshot().await;

	assert_eq!(published.keys.kids(), vec!["a1", "b1"]);
	assert!(published.keys.find("a2").is_none());

	let a1 = published.keys.find("a1").expect("a1");

	assert_eq!(a1.e.as_deref(), Some("AQAB"));
	assert_eq!(a1.crv, None);
	assert_eq!(published.keys.find("b1").and_then(|b1| b1.crv.as_deref()), Some("P-256"));
}

#[tokio::test]
async fn empty_allow_list_publishes_every_key() {
	let _ = tracing_subscriber::fmt::try_init();
	let (_a, url_a) = upstream(JWKS_A).await;
	let (_b, url_b) = upstream(JWKS_B).await;
	let manager = manager(vec![url_a, url_b], AllowList::allow_all());

	manager.refresh().await;

	assert_eq!(manager.snapshot().await.keys.kids(), vec!["a1", "a2", "b1"]);
}

#[tokio::test]
async fn unreachable_upstream_is_skipped() {
	let _ = tracing_subscriber::fmt::try_init();
	let dead = Url::parse("http://127.0.0.1:1/.well-known/jwks.json").expect("url");
	let (_b, url_b) = upstream(r#"{"keys":[{"kid":"b1"}]}"#).await;
	let manager = manager(vec![dead, url_b], AllowList::allow_all());
	let summary = manager.refresh().await;

	assert_eq!(summary.failed, 1);
	assert_eq!(manager.snapshot().await.keys.kids(), vec!["b1"]);
}

#[tokio::test]
async fn failing_status_and_garbage_bodies_are_skipped() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/missing"))
		.respond_with(ResponseTemplate::new(404).set_body_string(r#"{"keys":[{"kid":"ghost"}]}"#))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/garbage"))
		.respond_with(ResponseTemplate::new(200).set_body_string("<!doctype html>"))
		.mount(&server)
		.await;

	let base = Url::parse(&server.uri()).expect("mock url");
	let (_a, url_a) = upstream(JWKS_A).await;
	let manager = manager(
		vec![base.join("/missing").expect("join"), url_a, base.join("/garbage").expect("join")],
		AllowList::allow_all(),
	);
	let summary = manager.refresh().await;

	assert_eq!(summary.failed, 2);
	assert_eq!(manager.snapshot().await.keys.kids(), vec!["a1", "a2"]);
}

#[tokio::test]
async fn repeated_cycles_with_unchanged_upstreams_publish_identical_sets() {
	let _ = tracing_subscriber::fmt::try_init();
	let (_a, url_a) = upstream(JWKS_A).await;
	let (_b, url_b) = upstream(JWKS_B).await;
	let manager = manager(vec![url_a, url_b], AllowList::new(["a2", "b1"]));

	manager.refresh().await;

	let first = manager.snapshot().await;

	manager.refresh().await;

	let second = manager.snapshot().await;

	assert_eq!(first.generation + 1, second.generation);
	assert_eq!(*first.keys, *second.keys);
}

#[tokio::test]
async fn duplicate_kids_across_upstreams_are_both_published() {
	let _ = tracing_subscriber::fmt::try_init();
	let (_a, url_a) =
		upstream(r#"{"keys":[{"kid":"shared","kty":"RSA","n":"from-a","e":"AQAB"}]}"#).await;
	let (_b, url_b) =
		upstream(r#"{"keys":[{"kid":"shared","kty":"RSA","n":"from-b","e":"AQAB"}]}"#).await;
	let manager = manager(vec![url_a, url_b], AllowList::new(["shared"]));

	manager.refresh().await;

	let published = manager.snapshot().await;
	let moduli: Vec<_> = published.keys.iter().filter_map(|entry| entry.n.as_deref()).collect();

	assert_eq!(moduli, vec!["from-a", "from-b"]);
}

#[tokio::test]
async fn upstream_content_round_trips_through_the_cache() {
	let _ = tracing_subscriber::fmt::try_init();
	let (_a, url_a) = upstream(JWKS_A).await;
	let manager = manager(vec![url_a], AllowList::allow_all());

	manager.refresh().await;

	let expected: KeySet = serde_json::from_str(JWKS_A).expect("fixture");
	let encoded = serde_json::to_string(manager.snapshot().await.keys.as_ref()).expect("encode");
	let decoded: KeySet = serde_json::from_str(&encoded).expect("decode");

	assert_eq!(decoded, expected);
}
