//! Publishing the federated key set over a real listener.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use jwks_federation::{
	AllowList, FederationManager, FetchPolicy, FirstCycle, JWKS_PATH, KeySet, RefreshLoop, server,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

struct RunningServer {
	url: String,
	shutdown: oneshot::Sender<()>,
	handle: JoinHandle<jwks_federation::Result<()>>,
}
impl RunningServer {
	async fn start(manager: &FederationManager) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
		let addr = listener.local_addr().expect("local addr");
		let (shutdown, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(server::serve(listener, manager.cache(), async move {
			let _ = rx.await;
		}));

		Self { url: format!("http://{addr}{JWKS_PATH}"), shutdown, handle }
	}

	async fn stop(self) {
		let _ = self.shutdown.send(());

		self.handle.await.expect("server task").expect("server result");
	}
}

async fn get_jwks(client: &reqwest::Client, url: &str) -> KeySet {
	let response = client.get(url).send().await.expect("request");

	assert_eq!(response.status(), reqwest::StatusCode::OK);
	assert_eq!(
		response.headers().get("content-type").and_then(|value| value.to_str().ok()),
		Some("application/json")
	);

	response.json().await.expect("json body")
}

#[tokio::test]
async fn serves_empty_set_before_first_refresh_and_merged_set_after() {
	let _ = tracing_subscriber::fmt::try_init();
	let upstream = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/jwks.json"))
		.respond_with(ResponseTemplate::new(200).set_body_string(
			r#"{"keys":[{"kid":"k1","kty":"RSA","n":"abc","e":"AQAB"},{"kid":"k2","kty":"RSA"}]}"#,
		))
		.mount(&upstream)
		.await;

	let url = Url::parse(&format!("{}/jwks.json", upstream.uri())).expect("mock url");
	let manager = FederationManager::new(vec![url], AllowList::new(["k1"]), FetchPolicy::default())
		.expect("manager");
	let server = RunningServer::start(&manager).await;
	let client = reqwest::Client::new();

	assert!(get_jwks(&client, &server.url).await.is_empty());

	manager.refresh().await;

	let served = get_jwks(&client, &server.url).await;

	assert_eq!(served.kids(), vec!["k1"]);
	assert_eq!(served.keys[0].n.as_deref(), Some("abc"));

	server.stop().await;
}

#[tokio::test]
async fn every_upstream_down_still_answers_ok() {
	let _ = tracing_subscriber::fmt::try_init();
	let dead = Url::parse("http://127.0.0.1:1/jwks.json").expect("url");
	let manager = FederationManager::new(vec![dead], AllowList::allow_all(), FetchPolicy::default())
		.expect("manager");

	manager.refresh().await;

	let server = RunningServer::start(&manager).await;

	assert!(get_jwks(&reqwest::Client::new(), &server.url).await.is_empty());

	server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refresh_loop_rotates_keys_while_readers_poll() {
	let _ = tracing_subscriber::fmt::try_init();
	let upstream = MockServer::start().await;
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();

	Mock::given(method("GET"))
		.and(path("/jwks.json"))
		.respond_with(move |_: &wiremock::Request| {
			let call = counter.fetch_add(1, Ordering::SeqCst);
			let body = if call == 0 {
				r#"{"keys":[{"kid":"old-1"},{"kid":"old-2"}]}"#
			} else {
				r#"{"keys":[{"kid":"new-1"},{"kid":"new-2"}]}"#
			};

			ResponseTemplate::new(200).set_body_string(body)
		})
		.mount(&upstream)
		.await;

	let url = Url::parse(&format!("{}/jwks.json", upstream.uri())).expect("mock url");
	let manager = FederationManager::new(vec![url], AllowList::allow_all(), FetchPolicy::default())
		.expect("manager");
	let cancel = CancellationToken::new();
	let refresh_task = RefreshLoop::new(manager.clone(), Duration::from_millis(100))
		.expect("loop")
		.spawn(cancel.clone(), FirstCycle::Immediate);
	let server = RunningServer::start(&manager).await;
	let client = reqwest::Client::new();
	let mut saw_new = false;

	for _ in 0..100 {
		let served = get_jwks(&client, &server.url).await;
		let kids = served.kids();

		assert!(
			kids.is_empty() || kids == ["old-1", "old-2"] || kids == ["new-1", "new-2"],
			"observed a mixed key set: {kids:?}"
		);

		if kids == ["new-1", "new-2"] {
			saw_new = true;

			break;
		}

		tokio::time::sleep(Duration::from_millis(20)).await;
	}

	assert!(saw_new, "refresh loop never published the rotated keys");
	assert!(calls.load(Ordering::SeqCst) >= 2);

	cancel.cancel();
	tokio::time::timeout(Duration::from_secs(5), refresh_task)
		.await
		.expect("loop stops after cancellation")
		.expect("loop task");
	server.stop().await;
}
