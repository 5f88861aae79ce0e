//! Client configuration, credential locators, and the derived HL7v2 store address.

// std
use std::fs;
// self
use crate::{_prelude::*, error::ConfigError};

/// Default Cloud Healthcare API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://healthcare.googleapis.com/v1/";

/// Where the client finds its credential material.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialLocator {
	/// Use the process's ambient default credential chain.
	#[default]
	Ambient,
	/// Read service-account (or authorized-user) JSON from this file.
	File(PathBuf),
}
impl CredentialLocator {
	/// Returns `true` for the ambient locator.
	pub fn is_ambient(&self) -> bool {
		matches!(self, Self::Ambient)
	}
}
impl From<String> for CredentialLocator {
	fn from(value: String) -> Self {
		if value.is_empty() { Self::Ambient } else { Self::File(PathBuf::from(value)) }
	}
}
impl From<&str> for CredentialLocator {
	fn from(value: &str) -> Self {
		Self::from(value.to_owned())
	}
}
impl From<CredentialLocator> for String {
	fn from(value: CredentialLocator) -> Self {
		match value {
			CredentialLocator::Ambient => String::new(),
			CredentialLocator::File(path) => path.to_string_lossy().into_owned(),
		}
	}
}
impl Display for CredentialLocator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Ambient => f.write_str("<ambient>"),
			Self::File(path) => write!(f, "{}", path.display()),
		}
	}
}

/// Everything needed to build a [`crate::store::MessageStoreClient`].
///
/// The JSON keys mirror the deployment configs this client is fed with (`credential`,
/// `project`, `location`, `dataset`, `store`, `rate_limit`). A rate limit of zero or less
/// disables pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Credential file path, or empty for the ambient chain.
	#[serde(default)]
	pub credential: CredentialLocator,
	/// Cloud project identifier.
	pub project: String,
	/// Cloud location (region) identifier.
	pub location: String,
	/// Healthcare dataset identifier.
	pub dataset: String,
	/// HL7v2 store identifier.
	pub store: String,
	/// Steady request rate in requests per second; `<= 0` means unlimited.
	#[serde(default)]
	pub rate_limit: i64,
	/// API base URL that resource paths are appended to.
	#[serde(default = "default_endpoint")]
	pub endpoint: Url,
	/// Optional per-request deadline in seconds.
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
}
impl ClientConfig {
	/// Creates a config for the given store using ambient credentials and no rate limit.
	pub fn new(
		project: impl Into<String>,
		location: impl Into<String>,
		dataset: impl Into<String>,
		store: impl Into<String>,
	) -> Self {
		Self {
			credential: CredentialLocator::Ambient,
			project: project.into(),
			location: location.into(),
			dataset: dataset.into(),
			store: store.into(),
			rate_limit: 0,
			endpoint: default_endpoint(),
			request_timeout_secs: None,
		}
	}

	/// Loads a config from a JSON file.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| ConfigError::ConfigRead { path: path.to_owned(), source })?;
		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de)
			.map_err(|source| ConfigError::ConfigParse { path: path.to_owned(), source }.into())
	}

	/// Sets the credential locator.
	pub fn with_credential(mut self, credential: impl Into<CredentialLocator>) -> Self {
		self.credential = credential.into();

		self
	}

	/// Sets the steady request rate.
	pub fn with_rate_limit(mut self, rate_limit: i64) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Overrides the API base URL.
	pub fn with_endpoint(mut self, endpoint: Url) -> Self {
		self.endpoint = endpoint;

		self
	}

	/// Sets a per-request deadline.
	pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
		self.request_timeout_secs = Some(secs);

		self
	}

	/// Fails fast when any of the four store identifiers is empty.
	///
	/// The rate limit is not inspected; any sign is valid.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.project.is_empty() {
			return Err(ConfigError::MissingProjectId);
		}
		if self.location.is_empty() {
			return Err(ConfigError::MissingLocationId);
		}
		if self.dataset.is_empty() {
			return Err(ConfigError::MissingDatasetId);
		}
		if self.store.is_empty() {
			return Err(ConfigError::MissingHl7StoreId);
		}

		Ok(())
	}

	/// Derives the store's resource path from the identifiers.
	pub fn store_address(&self) -> StoreAddress {
		StoreAddress::new(&self.project, &self.location, &self.dataset, &self.store)
	}
}

/// Resource path of one HL7v2 store:
/// `projects/{p}/locations/{l}/datasets/{d}/hl7V2Stores/{s}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreAddress(String);
impl StoreAddress {
	const DATASETS: &'static str = "datasets";
	const HL7_STORES: &'static str = "hl7V2Stores";
	const LOCATIONS: &'static str = "locations";
	const PROJECTS: &'static str = "projects";

	/// Joins the identifiers with their fixed segment labels.
	pub fn new(project: &str, location: &str, dataset: &str, store: &str) -> Self {
		Self(
			[
				Self::PROJECTS,
				project,
				Self::LOCATIONS,
				location,
				Self::DATASETS,
				dataset,
				Self::HL7_STORES,
				store,
			]
			.join("/"),
		)
	}

	/// Returns the resource path.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Path of the message collection (`list`).
	pub fn messages(&self) -> String {
		format!("{}/messages", self.0)
	}

	/// Path of one stored message (`get`); `id` is percent-encoded as one segment.
	pub fn message(&self, id: &str) -> String {
		format!("{}/messages/{}", self.0, urlencoding::encode(id))
	}

	/// Path of the ingest operation (`send`).
	pub fn ingest(&self) -> String {
		format!("{}/messages:ingest", self.0)
	}
}
impl AsRef<str> for StoreAddress {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for StoreAddress {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn default_endpoint() -> Url {
	Url::parse(DEFAULT_ENDPOINT).expect("Default endpoint must parse.")
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	#[test]
	fn store_address_matches_resource_grammar() {
		let config = ClientConfig::new("p", "l", "d", "s");

		assert_eq!(
			config.store_address().as_str(),
			"projects/p/locations/l/datasets/d/hl7V2Stores/s"
		);
		assert_eq!(
			config.store_address().ingest(),
			"projects/p/locations/l/datasets/d/hl7V2Stores/s/messages:ingest"
		);
		assert_eq!(
			config.store_address().message("abc"),
			"projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/abc"
		);
		assert_eq!(
			config.store_address().message("a/b?c#d"),
			"projects/p/locations/l/datasets/d/hl7V2Stores/s/messages/a%2Fb%3Fc%23d"
		);
		assert_eq!(
			config.store_address().messages(),
			"projects/p/locations/l/datasets/d/hl7V2Stores/s/messages"
		);
	}

	#[test]
	fn validate_reports_first_missing_identifier() {
		assert!(matches!(
			ClientConfig::new("", "l", "d", "s").validate(),
			Err(ConfigError::MissingProjectId)
		));
		assert!(matches!(
			ClientConfig::new("p", "", "d", "s").validate(),
			Err(ConfigError::MissingLocationId)
		));
		assert!(matches!(
			ClientConfig::new("p", "l", "", "s").validate(),
			Err(ConfigError::MissingDatasetId)
		));
		assert!(matches!(
			ClientConfig::new("p", "l", "d", "").validate(),
			Err(ConfigError::MissingHl7StoreId)
		));
	}

	#[test]
	fn validate_ignores_rate_limit_sign() {
		for rate in [-5, 0, 1, 250] {
			ClientConfig::new("p", "l", "d", "s")
				.with_rate_limit(rate)
				.validate()
				.expect("Any rate limit should validate when identifiers are present.");
		}
	}

	#[test]
	fn credential_locator_treats_empty_as_ambient() {
		assert_eq!(CredentialLocator::from(""), CredentialLocator::Ambient);
		assert_eq!(
			CredentialLocator::from("./.secrets/creds.json"),
			CredentialLocator::File(PathBuf::from("./.secrets/creds.json"))
		);
		assert_eq!(String::from(CredentialLocator::Ambient), "");
	}

	#[test]
	fn json_config_uses_deployment_keys_and_defaults() {
		let payload = r#"{
			"credential": "",
			"project": "devx",
			"location": "us-central1",
			"dataset": "inap-dev",
			"store": "somehl7",
			"rate_limit": 20
		}"#;
		let config: ClientConfig =
			serde_json::from_str(payload).expect("Config payload should deserialize.");

		assert!(config.credential.is_ambient());
		assert_eq!(config.rate_limit, 20);
		assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
		assert_eq!(config.request_timeout_secs, None);
	}

	#[test]
	fn from_json_file_reports_parse_path() {
		let path = env::temp_dir().join(format!(
			"hl7v2_dispatch_config_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		));

		fs::write(&path, r#"{"project":"p","location":"l","dataset":"d","store":7}"#)
			.expect("Failed to write config fixture.");

		let err = ClientConfig::from_json_file(&path)
			.expect_err("A numeric store identifier must be rejected.");

		match err {
			Error::Config(ConfigError::ConfigParse { source, .. }) =>
				assert_eq!(source.path().to_string(), "store"),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove config fixture {}: {e}", path.display())
		});
	}
}
