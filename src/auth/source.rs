//! Token sources: where a [`MessageStoreClient`](crate::store::MessageStoreClient) gets the
//! bearer token for each request.

mod authorized_user;
mod metadata;
mod service_account;

pub use authorized_user::AuthorizedUserSource;
pub use metadata::{DEFAULT_METADATA_HOST, MetadataServerSource};
pub use service_account::ServiceAccountSource;

// crates.io
use reqwest::Response;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::AuthError,
	http::ResponseMetadata,
	obs::{self, OpKind},
};

/// Boxed future returned by [`TokenSource::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Anything able to hand out a currently valid access token.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns a token, minting or refreshing one when needed.
	fn token(&self) -> TokenFuture<'_>;
}

/// Pre-issued token that is returned as-is on every call.
#[derive(Clone, Debug)]
pub struct StaticTokenSource(AccessToken);
impl StaticTokenSource {
	/// Wraps a bearer secret that never expires.
	pub fn new(secret: impl Into<String>) -> Self {
		Self(AccessToken::new(secret))
	}
}
impl TokenSource for StaticTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}

/// Caches the last token of an inner source and refreshes it shortly before expiry.
///
/// Refreshes are single-flight: concurrent callers queue on the cache lock and the first
/// one through performs the exchange while the rest reuse its result.
pub struct CachedTokenSource {
	inner: Arc<dyn TokenSource>,
	cached: AsyncMutex<Option<AccessToken>>,
	window: Duration,
}
impl CachedTokenSource {
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Wraps `inner` with the default 60 second preemptive window.
	pub fn new(inner: Arc<dyn TokenSource>) -> Self {
		Self { inner, cached: AsyncMutex::new(None), window: Self::DEFAULT_PREEMPTIVE_WINDOW }
	}

	/// Overrides the preemptive refresh window; negative values clamp to zero.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	fn is_fresh(&self, token: &AccessToken, now: OffsetDateTime) -> bool {
		!token.is_expired_at(now) && !token.expires_within(now, self.window)
	}
}
impl Debug for CachedTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedTokenSource").field("window", &self.window).finish_non_exhaustive()
	}
}
impl TokenSource for CachedTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let mut cached = self.cached.lock().await;

			if let Some(token) = cached.as_ref() {
				if self.is_fresh(token, OffsetDateTime::now_utc()) {
					return Ok(token.clone());
				}
			}

			let token = obs::observe(OpKind::Token, "cached_refresh", self.inner.token()).await?;

			*cached = Some(token.clone());

			Ok(token)
		})
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

/// Decodes a token endpoint response shared by the JWT-bearer and metadata backends.
pub(crate) async fn read_token_response(response: Response) -> Result<AccessToken> {
	let meta = ResponseMetadata::from_response(&response);
	let success = response.status().is_success();
	let body = response.bytes().await.map_err(crate::error::TransportError::from)?;

	if !success {
		let message = match serde_json::from_slice::<TokenErrorResponse>(&body) {
			Ok(err) => match err.error_description {
				Some(description) => format!("{}: {description}", err.error),
				None => err.error,
			},
			Err(_) => body_preview(&body),
		};

		return Err(AuthError::TokenEndpoint {
			message,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into());
	}

	let de = &mut serde_json::Deserializer::from_slice(&body);
	let parsed: TokenResponse = serde_path_to_error::deserialize(de)
		.map_err(|source| AuthError::TokenResponseParse { source, status: meta.status })?;
	let issued_at = OffsetDateTime::now_utc();

	Ok(match parsed.expires_in {
		Some(secs) if secs > 0 =>
			AccessToken::issued(parsed.access_token, issued_at, Duration::seconds(secs)),
		_ => AccessToken::new(parsed.access_token),
	})
}

pub(crate) fn body_preview(body: &[u8]) -> String {
	const LIMIT: usize = 256;

	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return "empty response body".into();
	}

	trimmed.chars().take(LIMIT).collect()
}
