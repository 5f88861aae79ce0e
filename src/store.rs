//! Typed client for one Cloud Healthcare HL7v2 store.
//!
//! Every call goes through the same pipeline: take one permit from the client's
//! [`RateLimiter`], fetch a bearer token from the [`TokenSource`], issue the request with the
//! `X-GOOG-API-FORMAT-VERSION: 2` header, then decode the JSON body. Nothing is retried; all
//! failures go back to the caller.

pub mod model;

pub use model::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{Method, StatusCode};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenProvider, TokenSource, source::body_preview},
	config::{ClientConfig, StoreAddress},
	error::{ConfigError, DecodeError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata},
	limit::{self, RateLimiter},
	obs::{self, OpKind},
};

/// Header pinning the HL7v2 API response format.
pub const API_FORMAT_VERSION_HEADER: &str = "X-GOOG-API-FORMAT-VERSION";
/// Value sent in [`API_FORMAT_VERSION_HEADER`].
pub const API_FORMAT_VERSION: &str = "2";

/// HL7v2 store client bound to one resource path.
///
/// The client is cheap to share behind an [`Arc`]; concurrent callers serialize only on the
/// rate limiter.
pub struct MessageStoreClient {
	address: StoreAddress,
	endpoint: Url,
	http: ReqwestHttpClient,
	tokens: Arc<dyn TokenSource>,
	limiter: Arc<dyn RateLimiter>,
	request_timeout: Option<StdDuration>,
}
impl MessageStoreClient {
	/// Validates `config`, resolves its credentials, and builds the client.
	///
	/// Identifier validation runs first, so an invalid config never touches the credential
	/// file or the network. Credential failures surface here as [`Error::Auth`].
	pub async fn new(config: ClientConfig) -> Result<Self> {
		config.validate()?;

		let http = ReqwestHttpClient::build()?;
		let tokens = TokenProvider::new(http.clone())
			.resolve(&config.credential, &ScopeSet::healthcare())
			.await?;

		Self::with_token_source(config, http, tokens)
	}

	/// Builds the client around an already resolved token source.
	pub fn with_token_source(
		config: ClientConfig,
		http: ReqwestHttpClient,
		tokens: Arc<dyn TokenSource>,
	) -> Result<Self> {
		config.validate()?;

		let mut endpoint = config.endpoint.clone();

		if !endpoint.path().ends_with('/') {
			let path = format!("{}/", endpoint.path());

			endpoint.set_path(&path);
		}

		tracing::debug!(
			store = %config.store_address(),
			rate_limit = config.rate_limit,
			credential = %config.credential,
			"Configured HL7v2 store client."
		);

		Ok(Self {
			address: config.store_address(),
			endpoint,
			http,
			tokens,
			limiter: limit::rate_limiter(config.rate_limit),
			request_timeout: config.request_timeout_secs.map(StdDuration::from_secs),
		})
	}

	/// Resource path of the bound store.
	pub fn address(&self) -> &StoreAddress {
		&self.address
	}

	/// Ingests one message and returns the decoded acknowledgement plus the stored name.
	pub async fn send(&self, bytes: &[u8]) -> Result<SendResult> {
		let outbound = OutboundMessage::new(bytes);
		let digest = outbound.digest();
		let path = self.address.ingest();

		tracing::debug!(%digest, size = bytes.len(), "Ingesting HL7v2 message.");

		let response: IngestMessageResponse = self
			.execute(OpKind::Send, Method::POST, &path, Some(&outbound.into_request()))
			.await?;
		let result = response.into_send_result()?;

		tracing::info!(%digest, name = %result.name, "Message stored.");

		Ok(result)
	}

	/// Fetches a message by its identifier within the bound store.
	///
	/// The identifier is percent-encoded as a single path segment; empty, `.` and `..`
	/// identifiers are rejected with [`Error::InvalidMessageId`].
	pub async fn get_by_id(&self, id: &str) -> Result<Message> {
		if matches!(id, "" | "." | "..") {
			return Err(Error::InvalidMessageId { id: id.to_owned() });
		}

		self.get(&self.address.message(id)).await
	}

	/// Fetches a message by its full resource path.
	pub async fn get(&self, path: &str) -> Result<Message> {
		self.execute(OpKind::Get, Method::GET, path, None::<&()>).await
	}

	/// Lists the first page of messages in the bound store.
	pub async fn list(&self) -> Result<ListMessagesResponse> {
		self.execute(OpKind::List, Method::GET, &self.address.messages(), None::<&()>).await
	}

	async fn execute<B, T>(
		&self,
		op: OpKind,
		method: Method,
		path: &str,
		body: Option<&B>,
	) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: for<'de> Deserialize<'de>,
	{
		let call = obs::observe(op, "execute", self.execute_inner(op, method, path, body));

		match self.request_timeout {
			Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
				tracing::warn!(op = %op, path, "Request deadline elapsed.");

				Error::Cancelled
			})?,
			None => call.await,
		}
	}

	async fn execute_inner<B, T>(
		&self,
		op: OpKind,
		method: Method,
		path: &str,
		body: Option<&B>,
	) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: for<'de> Deserialize<'de>,
	{
		self.limiter.acquire().await;

		let token = self.tokens.token().await.map_err(token_failure)?;
		let url = self.resource_url(path)?;
		let mut request = self
			.http
			.request(method, url)
			.header(reqwest::header::AUTHORIZATION, token.authorization())
			.header(API_FORMAT_VERSION_HEADER, API_FORMAT_VERSION);

		if let Some(body) = body {
			let payload = serde_json::to_vec(body).map_err(TransportError::network)?;

			request = request.header(reqwest::header::CONTENT_TYPE, "application/json").body(payload);
		}

		let response = request.send().await.map_err(TransportError::from)?;
		let meta = ResponseMetadata::from_response(&response);
		let status = response.status();
		let bytes = response.bytes().await.map_err(TransportError::from)?;

		if status == StatusCode::NOT_FOUND && matches!(op, OpKind::Get) {
			return Err(Error::NotFound { path: path.to_owned() });
		}
		if !status.is_success() {
			return Err(TransportError::Status {
				status: status.as_u16(),
				message: error_message(&bytes),
				retry_after: meta.retry_after,
			}
			.into());
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de).map_err(|e| DecodeError::Body(e).into())
	}

	fn resource_url(&self, path: &str) -> Result<Url> {
		let raw = format!("{}{}", self.endpoint, path.trim_start_matches('/'));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { value: raw, source }.into())
	}
}
impl Debug for MessageStoreClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MessageStoreClient")
			.field("address", &self.address)
			.field("endpoint", &self.endpoint.as_str())
			.field("request_timeout", &self.request_timeout)
			.finish_non_exhaustive()
	}
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
	error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
	#[serde(default)]
	message: String,
}

/// Token failures during a call are transport failures of that call.
fn token_failure(err: Error) -> Error {
	match err {
		Error::Auth(source) => TransportError::Auth { source }.into(),
		other => other,
	}
}

/// Extracts `error.message` from a Google API error body, or falls back to a preview.
fn error_message(body: &[u8]) -> String {
	match serde_json::from_slice::<ApiErrorEnvelope>(body) {
		Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
		_ => body_preview(body),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::_preludet::{TEST_ACCESS_TOKEN, build_test_store_client};

	#[tokio::test]
	async fn list_sends_bearer_and_format_headers() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/v1/projects/p/locations/l/datasets/d/hl7V2Stores/s/messages")
					.header("authorization", format!("Bearer {TEST_ACCESS_TOKEN}"))
					.header("x-goog-api-format-version", API_FORMAT_VERSION);
				then.status(200).header("content-type", "application/json").body("{}");
			})
			.await;
		let page = build_test_store_client(&server.base_url())
			.list()
			.await
			.expect("List should succeed.");

		mock.assert_async().await;

		assert!(page.hl7_v2_messages.is_empty());
		assert!(page.next_page_token.is_none());
	}

	#[test]
	fn error_message_prefers_google_envelope() {
		assert_eq!(
			error_message(br#"{"error":{"code":403,"message":"denied","status":"PERMISSION_DENIED"}}"#),
			"denied"
		);
		assert_eq!(error_message(b"gateway timeout"), "gateway timeout");
	}

	#[test]
	fn endpoint_gains_trailing_slash() {
		let config = ClientConfig::new("p", "l", "d", "s")
			.with_endpoint(Url::parse("http://localhost:1234/v1").expect("URL should parse."));
		let client = MessageStoreClient::with_token_source(
			config,
			ReqwestHttpClient::default(),
			Arc::new(crate::auth::StaticTokenSource::new("t")),
		)
		.expect("Client should build.");
		let url = client.resource_url("projects/p/messages").expect("URL should build.");

		assert_eq!(url.as_str(), "http://localhost:1234/v1/projects/p/messages");
	}

	#[tokio::test]
	async fn new_rejects_invalid_config_before_resolving_credentials() {
		let config = ClientConfig::new("p", "l", "", "s")
			.with_credential(crate::config::CredentialLocator::File(PathBuf::from(
				"/definitely/missing/creds.json",
			)));
		let err =
			MessageStoreClient::new(config).await.expect_err("Missing dataset must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingDatasetId)));
	}

	#[tokio::test]
	async fn get_by_id_rejects_dot_segments() {
		let client = build_test_store_client("http://127.0.0.1:9");

		for id in ["", ".", ".."] {
			let err = client.get_by_id(id).await.expect_err("Dot segments must be rejected.");

			assert!(matches!(err, Error::InvalidMessageId { .. }));
		}
	}

	#[test]
	fn invalid_config_fails_before_credentials() {
		let config = ClientConfig::new("p", "", "d", "s");
		let err = MessageStoreClient::with_token_source(
			config,
			ReqwestHttpClient::default(),
			Arc::new(crate::auth::StaticTokenSource::new("t")),
		)
		.expect_err("Missing location must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingLocationId)));
	}
}
