//! On-disk credential material understood by the token sources.

// self
use crate::{_prelude::*, error::AuthError};

/// Token endpoint used when a credential file omits `token_uri`.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Parsed credential file, discriminated by its `type` field.
#[derive(Clone, Debug)]
pub enum CredentialFile {
	/// `service_account` key: signs its own JWT assertions.
	ServiceAccount(ServiceAccountKey),
	/// `authorized_user` credentials (gcloud application-default login): refresh-token grant.
	AuthorizedUser(AuthorizedUserKey),
}
impl CredentialFile {
	/// Parses credential JSON read from `path`.
	///
	/// Malformed JSON or missing fields fail with [`AuthError::CredentialParse`]; a
	/// well-formed file of an unknown `type` fails with [`AuthError::UnsupportedCredential`].
	/// Key material is not inspected here: a `service_account` whose `private_key` is not an
	/// RSA PEM is rejected with [`AuthError::InvalidPrivateKey`] when its token source is
	/// built, which still happens inside
	/// [`TokenProvider::resolve`](crate::auth::TokenProvider::resolve).
	pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self, AuthError> {
		#[derive(Deserialize)]
		struct TypeTag {
			#[serde(rename = "type")]
			kind: String,
		}

		let tag: TypeTag = parse(bytes, path)?;

		match tag.kind.as_str() {
			"service_account" => Ok(Self::ServiceAccount(parse(bytes, path)?)),
			"authorized_user" => Ok(Self::AuthorizedUser(parse(bytes, path)?)),
			_ => Err(AuthError::UnsupportedCredential { kind: tag.kind }),
		}
	}

	/// Returns the credential `type` label.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ServiceAccount(_) => "service_account",
			Self::AuthorizedUser(_) => "authorized_user",
		}
	}
}

/// Fields of a service-account key file needed to mint tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
	/// Service-account email, used as the JWT issuer.
	pub client_email: String,
	/// PEM-encoded RSA private key.
	pub private_key: String,
	/// Key identifier placed in the JWT header.
	#[serde(default)]
	pub private_key_id: Option<String>,
	/// OAuth token endpoint.
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("client_email", &self.client_email)
			.field("private_key", &"<redacted>")
			.field("private_key_id", &self.private_key_id)
			.field("token_uri", &self.token_uri)
			.finish()
	}
}

/// Fields of an `authorized_user` credential file.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUserKey {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: String,
	/// Long-lived refresh token.
	pub refresh_token: String,
	/// OAuth token endpoint.
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
}
impl Debug for AuthorizedUserKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedUserKey")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("token_uri", &self.token_uri)
			.finish()
	}
}

fn parse<T>(bytes: &[u8], path: &Path) -> Result<T, AuthError>
where
	T: for<'de> Deserialize<'de>,
{
	let de = &mut serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(de)
		.map_err(|source| AuthError::CredentialParse { path: path.to_owned(), source })
}

fn default_token_uri() -> String {
	DEFAULT_TOKEN_URI.into()
}
