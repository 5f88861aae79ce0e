// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccountKey, TokenFuture, TokenSource, source},
	error::{AuthError, TransportError},
	http::ReqwestHttpClient,
};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);

#[derive(Serialize)]
struct Claims<'a> {
	iss: &'a str,
	scope: String,
	aud: &'a str,
	iat: i64,
	exp: i64,
}

/// Mints tokens for a service-account key through the JWT-bearer grant.
pub struct ServiceAccountSource {
	http: ReqwestHttpClient,
	key: ServiceAccountKey,
	encoding_key: EncodingKey,
	scopes: ScopeSet,
}
impl ServiceAccountSource {
	/// Validates the private key up front so a bad key fails at construction.
	pub fn new(
		http: ReqwestHttpClient,
		key: ServiceAccountKey,
		scopes: ScopeSet,
	) -> Result<Self, AuthError> {
		let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
			.map_err(AuthError::InvalidPrivateKey)?;

		Ok(Self { http, key, encoding_key, scopes })
	}

	fn assertion(&self, now: OffsetDateTime) -> Result<String, AuthError> {
		let mut header = Header::new(Algorithm::RS256);

		header.kid = self.key.private_key_id.clone();

		let iat = now.unix_timestamp();
		let claims = Claims {
			iss: &self.key.client_email,
			scope: self.scopes.normalized(),
			aud: &self.key.token_uri,
			iat,
			exp: iat + ASSERTION_LIFETIME.whole_seconds(),
		};

		jsonwebtoken::encode(&header, &claims, &self.encoding_key)
			.map_err(AuthError::InvalidPrivateKey)
	}
}
impl Debug for ServiceAccountSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountSource")
			.field("key", &self.key)
			.field("scopes", &self.scopes)
			.finish_non_exhaustive()
	}
}
impl TokenSource for ServiceAccountSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let assertion = self.assertion(OffsetDateTime::now_utc())?;

			tracing::debug!(client_email = %self.key.client_email, "Exchanging service account assertion.");

			let response = self
				.http
				.post(&self.key.token_uri)
				.form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
				.send()
				.await
				.map_err(TransportError::from)?;

			source::read_token_response(response).await
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejects_non_pem_private_key() {
		let key = ServiceAccountKey {
			client_email: "svc@demo.iam.gserviceaccount.com".into(),
			private_key: "not a pem".into(),
			private_key_id: None,
			token_uri: crate::auth::DEFAULT_TOKEN_URI.into(),
		};
		let err = ServiceAccountSource::new(ReqwestHttpClient::default(), key, ScopeSet::healthcare())
			.expect_err("Garbage key material must be rejected.");

		assert!(matches!(err, AuthError::InvalidPrivateKey(_)));
	}
}
