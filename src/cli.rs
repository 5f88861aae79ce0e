//! Command line of the `hl7v2-dispatch` binary.

// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, CredentialLocator},
	dispatch::DispatchOptions,
};

/// Send every `.hl7` file under a directory to a Cloud Healthcare HL7v2 store.
#[derive(Clone, Debug, Parser)]
#[command(name = "hl7v2-dispatch", author, version, about, long_about = None)]
pub struct Cli {
	/// Directory scanned recursively for files whose name contains `.hl7`.
	#[arg(env = "HL7_DISPATCH_ROOT")]
	pub root: PathBuf,

	/// JSON client configuration; individual flags override its values.
	#[arg(short, long, env = "HL7_DISPATCH_CONFIG")]
	pub config: Option<PathBuf>,

	/// Credential file; omit to use the ambient default credentials.
	#[arg(long, env = "HL7_DISPATCH_CREDENTIAL")]
	pub credential: Option<PathBuf>,

	/// Cloud project identifier.
	#[arg(long, env = "HL7_DISPATCH_PROJECT")]
	pub project: Option<String>,

	/// Cloud location identifier.
	#[arg(long, env = "HL7_DISPATCH_LOCATION")]
	pub location: Option<String>,

	/// Healthcare dataset identifier.
	#[arg(long, env = "HL7_DISPATCH_DATASET")]
	pub dataset: Option<String>,

	/// HL7v2 store identifier.
	#[arg(long, env = "HL7_DISPATCH_STORE")]
	pub store: Option<String>,

	/// Requests per second; zero or less disables pacing.
	#[arg(long, env = "HL7_DISPATCH_RATE_LIMIT", allow_negative_numbers = true)]
	pub rate_limit: Option<i64>,

	/// API base URL.
	#[arg(long, env = "HL7_DISPATCH_ENDPOINT", value_name = "URL")]
	pub endpoint: Option<Url>,

	/// Per-request deadline in seconds.
	#[arg(long, env = "HL7_DISPATCH_REQUEST_TIMEOUT", value_name = "SECS")]
	pub request_timeout: Option<u64>,

	/// Passes over the root directory; 0 sends nothing.
	#[arg(short, long, env = "HL7_DISPATCH_LOOPS", default_value_t = 1)]
	pub loops: u32,

	/// Append a timestamped `ZAC` segment to every message.
	#[arg(long, env = "HL7_DISPATCH_TRAILER")]
	pub trailer: bool,

	/// Keep a copy of every transformed payload in this directory.
	#[arg(long, env = "HL7_DISPATCH_RETAIN_DIR")]
	pub retain_dir: Option<PathBuf>,
}
impl Cli {
	/// Merges the optional JSON file with the individual flags.
	///
	/// Without `--config`, the four store identifiers default to empty and are rejected by
	/// [`ClientConfig::validate`] when the client is built.
	pub fn client_config(&self) -> Result<ClientConfig> {
		let mut config = match &self.config {
			Some(path) => ClientConfig::from_json_file(path)?,
			None => ClientConfig::new("", "", "", ""),
		};

		if let Some(path) = &self.credential {
			config.credential = CredentialLocator::File(path.clone());
		}
		if let Some(project) = &self.project {
			config.project = project.clone();
		}
		if let Some(location) = &self.location {
			config.location = location.clone();
		}
		if let Some(dataset) = &self.dataset {
			config.dataset = dataset.clone();
		}
		if let Some(store) = &self.store {
			config.store = store.clone();
		}
		if let Some(rate) = self.rate_limit {
			config.rate_limit = rate;
		}
		if let Some(endpoint) = &self.endpoint {
			config.endpoint = endpoint.clone();
		}
		if let Some(secs) = self.request_timeout {
			config.request_timeout_secs = Some(secs);
		}

		Ok(config)
	}

	/// Run parameters for the dispatcher.
	pub fn dispatch_options(&self) -> DispatchOptions {
		DispatchOptions {
			loops: self.loops,
			trailer: self.trailer,
			retain_dir: self.retain_dir.clone(),
		}
	}
}
