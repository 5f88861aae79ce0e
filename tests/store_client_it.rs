// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use httpmock::prelude::*;
use serde_json::json;
// self
use hl7v2_dispatch::{
	auth::{StaticTokenSource, TokenFuture, TokenSource},
	config::ClientConfig,
	error::{AuthError, DecodeError, Error, TransportError},
	http::ReqwestHttpClient,
	store::MessageStoreClient,
	url::Url,
};

const STORE: &str = "/v1/projects/p/locations/l/datasets/d/hl7V2Stores/s";
const ACK: &[u8] = b"MSH|^~\\&|STORE|GCP|APP|FAC|20240101120000||ACK|1|P|2.5\rMSA|AA|CTRL-1";

fn client(server: &MockServer, timeout_secs: Option<u64>) -> MessageStoreClient {
	let endpoint = Url::parse(&server.url("/v1/")).expect("Mock endpoint should parse.");
	let mut config = ClientConfig::new("p", "l", "d", "s").with_endpoint(endpoint);

	if let Some(secs) = timeout_secs {
		config = config.with_request_timeout_secs(secs);
	}

	let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("mock-token"));

	MessageStoreClient::with_token_source(config, ReqwestHttpClient::default(), tokens)
		.expect("Store client should build against the mock server.")
}

struct RevokedTokenSource;
impl TokenSource for RevokedTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async {
			Err(AuthError::TokenEndpoint {
				message: "invalid_grant: Token has been expired or revoked.".into(),
				status: Some(400),
				retry_after: None,
			}
			.into())
		})
	}
}

#[tokio::test]
async fn send_returns_ack_and_name_unmodified() {
	let server = MockServer::start_async().await;
	let payload = b"MSH|^~\\&|APP|FAC|STORE|GCP|20240101120000||ADT^A01|CTRL-1|P|2.5\rPID|1";
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("{STORE}/messages:ingest"))
				.header("authorization", "Bearer mock-token")
				.header("x-goog-api-format-version", "2")
				.json_body(json!({ "message": { "data": STANDARD.encode(payload), "labels": {} } }));
			then.status(200).header("content-type", "application/json").body(
				json!({
					"hl7Ack": STANDARD.encode(ACK),
					"message": {
						"name": "projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/m-1"
					}
				})
				.to_string(),
			);
		})
		.await;
	let result = client(&server, None).send(payload).await.expect("Send should succeed.");

	mock.assert_async().await;

	assert_eq!(result.ack, ACK);
	assert_eq!(result.name, "projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/m-1");
}

#[tokio::test]
async fn send_rejects_ack_that_is_not_base64() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{STORE}/messages:ingest"));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"hl7Ack":"%%%not-base64%%%","message":{"name":"m"}}"#);
		})
		.await;

	let err = client(&server, None).send(b"MSH|^~\\&|").await.expect_err("Bad ack must fail.");

	assert!(matches!(err, Error::Decode(DecodeError::Base64 { field: "hl7Ack", .. })));
}

#[tokio::test]
async fn get_by_id_maps_404_to_not_found() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("{STORE}/messages/missing"))
				.header("x-goog-api-format-version", "2");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"error":{"code":404,"message":"not found","status":"NOT_FOUND"}}"#);
		})
		.await;
	let err =
		client(&server, None).get_by_id("missing").await.expect_err("Missing message must fail.");

	mock.assert_async().await;

	match err {
		Error::NotFound { path } =>
			assert_eq!(path, "projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/missing"),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn get_by_id_decodes_message() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{STORE}/messages/m-1"));
			then.status(200).header("content-type", "application/json").body(
				json!({
					"name": "projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/m-1",
					"data": STANDARD.encode(ACK),
					"messageType": "ACK",
					"createTime": "2024-01-01T12:00:00Z"
				})
				.to_string(),
			);
		})
		.await;

	let message = client(&server, None).get_by_id("m-1").await.expect("Get should succeed.");

	assert_eq!(message.message_type.as_deref(), Some("ACK"));
	assert_eq!(message.decoded_data().expect("Data should decode."), ACK);
}

#[tokio::test]
async fn list_exposes_page_token_without_following_it() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{STORE}/messages"));
			then.status(200).header("content-type", "application/json").body(
				r#"{"hl7V2Messages":[{"name":"a"},{"name":"b"}],"nextPageToken":"page-2"}"#,
			);
		})
		.await;
	let page = client(&server, None).list().await.expect("List should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(page.hl7_v2_messages.len(), 2);
	assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
}

#[tokio::test]
async fn non_success_status_carries_retry_after() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{STORE}/messages"));
			then.status(429)
				.header("retry-after", "7")
				.header("content-type", "application/json")
				.body(r#"{"error":{"code":429,"message":"quota exceeded"}}"#);
		})
		.await;

	let err = client(&server, None).list().await.expect_err("Throttled list must fail.");

	match err {
		Error::Transport(TransportError::Status { status, message, retry_after }) => {
			assert_eq!(status, 429);
			assert_eq!(message, "quota exceeded");
			assert_eq!(retry_after, Some(time::Duration::seconds(7)));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn request_deadline_cancels_slow_calls() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{STORE}/messages"));
			then.status(200).delay(StdDuration::from_secs(3)).body("{}");
		})
		.await;

	let err = client(&server, Some(1)).list().await.expect_err("Slow call must be cancelled.");

	assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn token_refresh_failure_is_a_transport_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST);
			then.status(200);
		})
		.await;
	let endpoint = Url::parse(&server.url("/v1/")).expect("Mock endpoint should parse.");
	let client = MessageStoreClient::with_token_source(
		ClientConfig::new("p", "l", "d", "s").with_endpoint(endpoint),
		ReqwestHttpClient::default(),
		Arc::new(RevokedTokenSource),
	)
	.expect("Store client should build against the mock server.");
	let err = client.send(b"MSH|^~\\&|").await.expect_err("A revoked token must fail the send.");

	match err {
		Error::Transport(TransportError::Auth {
			source: AuthError::TokenEndpoint { status, .. },
		}) => assert_eq!(status, Some(400)),
		other => panic!("Unexpected error: {other:?}."),
	}

	mock.assert_calls_async(0).await;
}
