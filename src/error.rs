//! Crate-wide error type and its per-concern sub-enums.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal to client construction.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential material could not be resolved while building a client.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Network or HTTP failure while talking to the store.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A response field could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The acknowledgement was malformed or negative.
	#[error(transparent)]
	Ack(#[from] AckError),

	/// The store has no resource at the requested path.
	#[error("No message exists at {path}.")]
	NotFound {
		/// Resource path that was requested.
		path: String,
	},
	/// A message identifier cannot name a single resource.
	#[error("Message id `{id}` is not a valid path segment.")]
	InvalidMessageId {
		/// Rejected identifier.
		id: String,
	},
	/// The per-request deadline elapsed before the call completed.
	#[error("Request was cancelled because its deadline elapsed.")]
	Cancelled,
	/// A message file could not be read, or its retained copy could not be written.
	#[error("Failed to access message file {}.", .path.display())]
	MessageFile {
		/// File that failed.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The dispatch trailer timestamp could not be formatted.
	#[error("Failed to format the trailer timestamp.")]
	Trailer(#[from] time::error::Format),
	/// A directory could not be scanned for message files.
	#[error("Failed to scan {}.", .path.display())]
	Discovery {
		/// Directory that failed to scan.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The project identifier is empty.
	#[error("Missing project id.")]
	MissingProjectId,
	/// The location identifier is empty.
	#[error("Missing location id.")]
	MissingLocationId,
	/// The dataset identifier is empty.
	#[error("Missing dataset id.")]
	MissingDatasetId,
	/// The HL7v2 store identifier is empty.
	#[error("Missing HL7 store id.")]
	MissingHl7StoreId,

	/// The API endpoint or a derived resource URL is not a valid URL.
	#[error("Endpoint URL is invalid: {value}.")]
	InvalidEndpoint {
		/// Offending URL string.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration file could not be read.
	#[error("Failed to read configuration file {}.", .path.display())]
	ConfigRead {
		/// Configuration file path.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration file is not valid JSON for [`crate::config::ClientConfig`].
	#[error("Failed to parse configuration file {}.", .path.display())]
	ConfigParse {
		/// Configuration file path.
		path: PathBuf,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Credential resolution and token exchange failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Credential file could not be read.
	#[error("Failed to read credential file {}.", .path.display())]
	CredentialRead {
		/// Credential file path.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential file is not valid credential JSON.
	#[error("Failed to parse credential file {}.", .path.display())]
	CredentialParse {
		/// Credential file path.
		path: PathBuf,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Credential file declares a type this crate cannot mint tokens for.
	#[error("Credential type `{kind}` is not supported.")]
	UnsupportedCredential {
		/// Declared `type` field.
		kind: String,
	},
	/// Service-account private key is not a valid RSA PEM.
	#[error("Service account private key is invalid.")]
	InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
	/// No ambient credential source could be located.
	#[error("No ambient credentials are available: {reason}.")]
	AmbientUnavailable {
		/// Why the ambient chain gave up.
		reason: String,
	},
	/// Token endpoint rejected the request or answered unexpectedly.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Per-call failures (network, IO, token refresh, HTTP status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the healthcare API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the healthcare API.")]
	Io(#[from] std::io::Error),
	/// The bearer token for the call could not be obtained or refreshed.
	#[error("Failed to obtain an access token for the request.")]
	Auth {
		/// Token source failure.
		#[source]
		source: AuthError,
	},
	/// The API answered with a non-success status.
	#[error("Healthcare API returned HTTP {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Error message extracted from the body (or a body preview).
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Response decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// A base64 field did not decode.
	#[error("Field `{field}` is not valid base64.")]
	Base64 {
		/// JSON field name.
		field: &'static str,
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// Response body did not match the expected JSON shape.
	#[error("Response body is not the expected JSON.")]
	Body(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// A required field was absent from the response.
	#[error("Response is missing the `{field}` field.")]
	MissingField {
		/// JSON field name.
		field: &'static str,
	},
}

/// Acknowledgement parsing and classification failures.
#[derive(Debug, ThisError)]
pub enum AckError {
	/// The acknowledgement bytes are not a well-formed HL7v2 message.
	#[error(transparent)]
	Parse(#[from] crate::ack::ParseError),
	/// The receiving system returned a negative acknowledgement.
	#[error("Receiving system returned a negative acknowledgement{}.", ack_text_suffix(.text))]
	NegativeAcknowledgement {
		/// MSA-3 text, when present.
		text: Option<String>,
	},
	/// The acknowledgement type is neither ACK nor NACK.
	#[error("Acknowledgement type `{message_type}` is not recognized.")]
	UnrecognizedAcknowledgement {
		/// MSH-9 message type that was found.
		message_type: String,
	},
}

fn ack_text_suffix(text: &Option<String>) -> String {
	text.as_deref().map(|t| format!(": {t}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_error_converts_into_crate_error() {
		let err: Error = ConfigError::MissingDatasetId.into();

		assert!(matches!(err, Error::Config(ConfigError::MissingDatasetId)));
		assert_eq!(err.to_string(), "Missing dataset id.");
	}

	#[test]
	fn negative_ack_message_includes_text_when_present() {
		let with_text = AckError::NegativeAcknowledgement { text: Some("bad PID".into()) };
		let without_text = AckError::NegativeAcknowledgement { text: None };

		assert_eq!(
			with_text.to_string(),
			"Receiving system returned a negative acknowledgement: bad PID."
		);
		assert_eq!(
			without_text.to_string(),
			"Receiving system returned a negative acknowledgement."
		);
	}

	#[test]
	fn discovery_error_exposes_io_source() {
		let err = Error::Discovery {
			path: PathBuf::from("/missing"),
			source: std::io::Error::from(std::io::ErrorKind::NotFound),
		};

		assert!(StdError::source(&err).is_some());
		assert_eq!(err.to_string(), "Failed to scan /missing.");
	}
}
