//! Credential resolution: turns a [`CredentialLocator`] into a ready [`TokenSource`].

// std
use std::{env, fs, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::{
		AuthorizedUserSource, CachedTokenSource, CredentialFile, DEFAULT_METADATA_HOST,
		MetadataServerSource, ScopeSet, ServiceAccountSource, TokenSource,
	},
	config::CredentialLocator,
	error::AuthError,
	http::ReqwestHttpClient,
};

/// Environment variable naming an explicit credential file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

const METADATA_FLAVOR: &str = "Metadata-Flavor";
const METADATA_FLAVOR_GOOGLE: &str = "Google";

/// Boxed future returned by [`AmbientResolver::resolve`].
pub type ResolveFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Arc<dyn TokenSource>>> + 'a + Send>>;

/// Looks up credentials from the runtime environment.
pub trait AmbientResolver
where
	Self: Send + Sync,
{
	/// Builds a token source for `scopes`, or fails when no ambient credentials exist.
	fn resolve<'a>(&'a self, scopes: &'a ScopeSet) -> ResolveFuture<'a>;
}

/// Application-default chain: env file, then the gcloud well-known file, then the metadata
/// server.
///
/// The metadata server is only chosen once it has answered a short request with the
/// `Metadata-Flavor: Google` header, unless `GCE_METADATA_HOST` names it explicitly. Off
/// Google Cloud the chain therefore fails at construction with
/// [`AuthError::AmbientUnavailable`].
#[derive(Clone, Debug)]
pub struct DefaultAmbientResolver {
	http: ReqwestHttpClient,
	env_path: Option<PathBuf>,
	well_known_path: Option<PathBuf>,
	metadata_host: String,
	metadata_fallback: bool,
	metadata_check: bool,
	check_timeout: StdDuration,
}
impl DefaultAmbientResolver {
	const DEFAULT_CHECK_TIMEOUT: StdDuration = StdDuration::from_millis(500);

	/// Captures the chain inputs from the process environment.
	pub fn from_env(http: ReqwestHttpClient) -> Self {
		let env_path =
			env::var_os(CREDENTIALS_ENV).filter(|value| !value.is_empty()).map(PathBuf::from);
		let well_known_path = env::var_os("HOME").map(|home| {
			PathBuf::from(home).join(".config/gcloud/application_default_credentials.json")
		});
		let explicit_host = env::var(METADATA_HOST_ENV).ok().filter(|value| !value.is_empty());

		Self {
			http,
			env_path,
			well_known_path,
			metadata_check: explicit_host.is_none(),
			metadata_host: explicit_host.unwrap_or_else(|| DEFAULT_METADATA_HOST.into()),
			metadata_fallback: true,
			check_timeout: Self::DEFAULT_CHECK_TIMEOUT,
		}
	}

	/// Overrides the explicit credential file (normally `GOOGLE_APPLICATION_CREDENTIALS`).
	pub fn with_env_path(mut self, path: Option<PathBuf>) -> Self {
		self.env_path = path;

		self
	}

	/// Overrides the gcloud well-known credential file location.
	pub fn with_well_known_path(mut self, path: Option<PathBuf>) -> Self {
		self.well_known_path = path;

		self
	}

	/// Overrides the metadata server host.
	pub fn with_metadata_host(mut self, host: impl Into<String>) -> Self {
		self.metadata_host = host.into();

		self
	}

	/// Enables or disables the metadata server as the last resort.
	pub fn with_metadata_fallback(mut self, enabled: bool) -> Self {
		self.metadata_fallback = enabled;

		self
	}

	/// Requires (or skips) the reachability check before the metadata server is chosen.
	pub fn with_metadata_check(mut self, enabled: bool) -> Self {
		self.metadata_check = enabled;

		self
	}

	/// Overrides how long the metadata check may take.
	pub fn with_check_timeout(mut self, timeout: StdDuration) -> Self {
		self.check_timeout = timeout;

		self
	}

	async fn metadata_reachable(&self) -> bool {
		let url = format!("http://{}/computeMetadata/v1/", self.metadata_host.trim_end_matches('/'));
		let response = self
			.http
			.get(url)
			.header(METADATA_FLAVOR, METADATA_FLAVOR_GOOGLE)
			.timeout(self.check_timeout)
			.send()
			.await;

		match response {
			Ok(response) => response
				.headers()
				.get(METADATA_FLAVOR)
				.is_some_and(|value| value.as_bytes() == METADATA_FLAVOR_GOOGLE.as_bytes()),
			Err(e) => {
				tracing::debug!(host = %self.metadata_host, error = %e, "Metadata server check failed.");

				false
			},
		}
	}
}
impl AmbientResolver for DefaultAmbientResolver {
	fn resolve<'a>(&'a self, scopes: &'a ScopeSet) -> ResolveFuture<'a> {
		Box::pin(async move {
			// An explicitly named file must work; no silent fallback past it.
			if let Some(path) = &self.env_path {
				tracing::debug!(path = %path.display(), "Using credentials named by {CREDENTIALS_ENV}.");

				return source_from_file(&self.http, path, scopes);
			}
			if let Some(path) = self.well_known_path.as_deref().filter(|path| path.is_file()) {
				tracing::debug!(path = %path.display(), "Using gcloud application default credentials.");

				return source_from_file(&self.http, path, scopes);
			}
			if !self.metadata_fallback {
				return Err(AuthError::AmbientUnavailable {
					reason: "no credential file found and the metadata server is disabled".into(),
				}
				.into());
			}
			if self.metadata_check && !self.metadata_reachable().await {
				return Err(AuthError::AmbientUnavailable {
					reason: format!(
						"no credential file found and no metadata server answered at {}",
						self.metadata_host
					),
				}
				.into());
			}

			tracing::debug!(host = %self.metadata_host, "Falling back to the metadata server.");

			let source = MetadataServerSource::new(
				self.http.clone(),
				self.metadata_host.clone(),
				scopes.clone(),
			);

			Ok(Arc::new(CachedTokenSource::new(Arc::new(source))) as Arc<dyn TokenSource>)
		})
	}
}

/// Resolves a [`CredentialLocator`] into a cached [`TokenSource`].
///
/// File credentials are read and validated eagerly so a bad locator fails at client
/// construction rather than on the first request. The ambient chain is consulted only for
/// [`CredentialLocator::Ambient`].
#[derive(Clone)]
pub struct TokenProvider {
	http: ReqwestHttpClient,
	ambient: Arc<dyn AmbientResolver>,
}
impl TokenProvider {
	/// Creates a provider backed by [`DefaultAmbientResolver::from_env`].
	pub fn new(http: ReqwestHttpClient) -> Self {
		let ambient = Arc::new(DefaultAmbientResolver::from_env(http.clone()));

		Self { http, ambient }
	}

	/// Replaces the ambient resolver.
	pub fn with_ambient_resolver(mut self, ambient: Arc<dyn AmbientResolver>) -> Self {
		self.ambient = ambient;

		self
	}

	/// Produces a token source for `locator`, requesting `scopes`.
	pub async fn resolve(
		&self,
		locator: &CredentialLocator,
		scopes: &ScopeSet,
	) -> Result<Arc<dyn TokenSource>> {
		match locator {
			CredentialLocator::Ambient => self.ambient.resolve(scopes).await,
			CredentialLocator::File(path) => source_from_file(&self.http, path, scopes),
		}
	}
}
impl Debug for TokenProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProvider").finish_non_exhaustive()
	}
}

/// Loads a credential file and wraps the matching backend in a [`CachedTokenSource`].
pub fn source_from_file(
	http: &ReqwestHttpClient,
	path: &Path,
	scopes: &ScopeSet,
) -> Result<Arc<dyn TokenSource>> {
	let bytes = fs::read(path)
		.map_err(|source| AuthError::CredentialRead { path: path.to_owned(), source })?;
	let inner: Arc<dyn TokenSource> = match CredentialFile::from_slice(&bytes, path)? {
		CredentialFile::ServiceAccount(key) =>
			Arc::new(ServiceAccountSource::new(http.clone(), key, scopes.clone())?),
		CredentialFile::AuthorizedUser(key) =>
			Arc::new(AuthorizedUserSource::new(http.clone(), key, scopes.clone())?),
	};

	Ok(Arc::new(CachedTokenSource::new(inner)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn resolver() -> DefaultAmbientResolver {
		DefaultAmbientResolver::from_env(ReqwestHttpClient::default())
			.with_env_path(None)
			.with_well_known_path(None)
			.with_metadata_check(true)
	}

	#[tokio::test]
	async fn ambient_chain_without_files_or_metadata_is_unavailable() {
		let err = resolver()
			.with_metadata_fallback(false)
			.resolve(&ScopeSet::healthcare())
			.await
			.err()
			.expect("Empty chain must fail.");

		assert!(matches!(err, Error::Auth(AuthError::AmbientUnavailable { .. })));
	}

	#[tokio::test]
	async fn unreachable_metadata_server_is_unavailable() {
		let err = resolver()
			.with_metadata_host("127.0.0.1:9")
			.with_check_timeout(StdDuration::from_millis(200))
			.resolve(&ScopeSet::healthcare())
			.await
			.err()
			.expect("A chain with nothing behind it must fail.");

		assert!(matches!(err, Error::Auth(AuthError::AmbientUnavailable { .. })));
	}

	#[tokio::test]
	async fn explicit_metadata_host_is_trusted_without_checking() {
		resolver()
			.with_metadata_host("127.0.0.1:9")
			.with_metadata_check(false)
			.resolve(&ScopeSet::healthcare())
			.await
			.unwrap_or_else(|e| panic!("An explicit metadata host should be trusted: {e}."));
	}

	#[tokio::test]
	async fn env_path_is_authoritative() {
		let err = resolver()
			.with_env_path(Some(PathBuf::from("/definitely/missing/creds.json")))
			.resolve(&ScopeSet::healthcare())
			.await
			.err()
			.expect("A missing explicit file must fail.");

		assert!(matches!(err, Error::Auth(AuthError::CredentialRead { .. })));
	}
}
