//! The reqwest client shared by store calls and token exchanges.
//!
//! Store calls use [`ReqwestHttpClient`] directly. Refresh-token exchanges go through the
//! `oauth2` crate, which only accepts an [`AsyncHttpClient`]; [`OAuthExchange`] adapts the
//! same client and remembers the status and Retry-After of the response so token errors
//! carry the same hints as store errors.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{
	Request, Response,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Status and Retry-After hint of one HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// Status code, when a response arrived at all.
	pub status: Option<u16>,
	/// How long upstream asked callers to back off.
	pub retry_after: Option<Duration>,
}
impl ResponseMetadata {
	/// Captures the metadata of `response`.
	pub fn from_response(response: &Response) -> Self {
		Self {
			status: Some(response.status().as_u16()),
			retry_after: parse_retry_after(response.headers()),
		}
	}
}

/// Cloneable handle on the process's reqwest client.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Uses an existing reqwest client as is.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn build() -> Result<Self, ConfigError> {
		ReqwestClient::builder()
			.redirect(Policy::none())
			.build()
			.map(Self)
			.map_err(ConfigError::http_client_build)
	}

	/// Starts an `oauth2` exchange on this client.
	pub fn oauth_exchange(&self) -> OAuthExchange {
		OAuthExchange { client: self.0.clone(), last: Mutex::new(ResponseMetadata::default()) }
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// [`AsyncHttpClient`] for one token exchange.
#[derive(Debug)]
pub struct OAuthExchange {
	client: ReqwestClient,
	last: Mutex<ResponseMetadata>,
}
impl OAuthExchange {
	/// Metadata of the last response seen, or the default when nothing came back.
	pub fn last_response(&self) -> ResponseMetadata {
		self.last.lock().clone()
	}
}
impl<'c> AsyncHttpClient<'c> for OAuthExchange {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let request = Request::try_from(request).map_err(Box::new)?;
			let response = self.client.execute(request).await.map_err(Box::new)?;

			*self.last.lock() = ResponseMetadata::from_response(&response);

			let status = response.status();
			let headers = response.headers().clone();
			let body = response.bytes().await.map_err(Box::new)?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Reads a Retry-After header given as delta-seconds or as an RFC 2822 date.
///
/// Dates in the past and negative or unparseable values yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	match raw.parse::<i64>() {
		Ok(secs) if secs >= 0 => Some(Duration::seconds(secs)),
		Ok(_) => None,
		Err(_) => OffsetDateTime::parse(raw, &Rfc2822)
			.ok()
			.map(|at| at - OffsetDateTime::now_utc())
			.filter(|delta| delta.is_positive()),
	}
}
