// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenFuture, TokenSource, source},
	error::TransportError,
	http::ReqwestHttpClient,
};

/// Host used when `GCE_METADATA_HOST` is unset.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Fetches tokens for the attached service account from the compute metadata server.
#[derive(Clone, Debug)]
pub struct MetadataServerSource {
	http: ReqwestHttpClient,
	host: String,
	scopes: ScopeSet,
}
impl MetadataServerSource {
	/// Creates a source for the metadata server at `host` (a bare `host[:port]`).
	pub fn new(http: ReqwestHttpClient, host: impl Into<String>, scopes: ScopeSet) -> Self {
		Self { http, host: host.into(), scopes }
	}

	/// Token URL queried on every refresh.
	pub fn token_url(&self) -> String {
		let base = format!(
			"http://{}/computeMetadata/v1/instance/service-accounts/default/token",
			self.host.trim_end_matches('/')
		);

		if self.scopes.is_empty() {
			return base;
		}

		let scopes = self.scopes.joined(',');
		let scopes: String = url::form_urlencoded::byte_serialize(scopes.as_bytes()).collect();

		format!("{base}?scopes={scopes}")
	}
}
impl TokenSource for MetadataServerSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let response = self
				.http
				.get(self.token_url())
				.header("Metadata-Flavor", "Google")
				.send()
				.await
				.map_err(TransportError::from)?;

			source::read_token_response(response).await
		})
	}
}
