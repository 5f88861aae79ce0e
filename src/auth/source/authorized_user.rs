// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RefreshToken,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AuthorizedUserKey, ScopeSet, TokenFuture, TokenSource},
	error::{AuthError, ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata},
};

type RefreshClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Exchanges the refresh token of an `authorized_user` credential for access tokens.
pub struct AuthorizedUserSource {
	http: ReqwestHttpClient,
	client: RefreshClient,
	refresh_token: RefreshToken,
	scopes: ScopeSet,
}
impl AuthorizedUserSource {
	/// Configures the refresh-token client; the token URI must be a valid URL.
	pub fn new(http: ReqwestHttpClient, key: AuthorizedUserKey, scopes: ScopeSet) -> Result<Self> {
		let token_url = TokenUrl::new(key.token_uri.clone()).map_err(|source| {
			ConfigError::InvalidEndpoint { value: key.token_uri.clone(), source }
		})?;
		let client = BasicClient::new(ClientId::new(key.client_id))
			.set_client_secret(ClientSecret::new(key.client_secret))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		Ok(Self { http, client, refresh_token: RefreshToken::new(key.refresh_token), scopes })
	}
}
impl Debug for AuthorizedUserSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedUserSource")
			.field("client_id", self.client.client_id())
			.field("scopes", &self.scopes)
			.finish_non_exhaustive()
	}
}
impl TokenSource for AuthorizedUserSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let exchange = self.http.oauth_exchange();
			let mut request = self.client.exchange_refresh_token(&self.refresh_token);

			for scope in self.scopes.iter() {
				request = request.add_scope(Scope::new(scope.to_owned()));
			}

			let response = request
				.request_async(&exchange)
				.await
				.map_err(|err| map_request_error(exchange.last_response(), err))?;
			let issued_at = OffsetDateTime::now_utc();
			let secret = response.access_token().secret().to_owned();

			Ok(match response.expires_in() {
				Some(lifetime) => {
					let secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);

					AccessToken::issued(secret, issued_at, Duration::seconds(secs))
				},
				None => AccessToken::new(secret),
			})
		})
	}
}

fn map_request_error(
	meta: ResponseMetadata,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let mut message = response.error().as_ref().to_owned();

			if let Some(description) = response.error_description() {
				message.push_str(": ");
				message.push_str(description);
			}

			AuthError::TokenEndpoint { message, status: meta.status, retry_after: meta.retry_after }
				.into()
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			TransportError::from(*inner).into(),
		RequestTokenError::Request(HttpClientError::Io(inner)) => TransportError::Io(inner).into(),
		RequestTokenError::Request(other) => TransportError::network(other).into(),
		RequestTokenError::Parse(source, _body) =>
			AuthError::TokenResponseParse { source, status: meta.status }.into(),
		RequestTokenError::Other(message) => AuthError::TokenEndpoint {
			message,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}
