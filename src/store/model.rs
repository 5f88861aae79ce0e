//! JSON resources exchanged with the HL7v2 store.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::DecodeError};

/// One stored HL7v2 message resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	/// Server-assigned resource name.
	#[serde(default)]
	pub name: String,
	/// Base64-encoded raw message.
	#[serde(default)]
	pub data: String,
	/// User-supplied labels.
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
	/// Ingest timestamp (RFC 3339).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub create_time: Option<String>,
	/// MSH-9 message type as indexed by the store.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message_type: Option<String>,
	/// MSH-4 sending facility.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub send_facility: Option<String>,
	/// MSH-7 send time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub send_time: Option<String>,
	/// Patient identifiers extracted by the store.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub patient_ids: Vec<PatientId>,
	/// Store-parsed representation, kept opaque.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parsed_data: Option<serde_json::Value>,
	/// Schematized representation, kept opaque.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub schematized_data: Option<serde_json::Value>,
}
impl Message {
	/// Decodes the `data` field.
	pub fn decoded_data(&self) -> Result<Vec<u8>, DecodeError> {
		STANDARD.decode(&self.data).map_err(|source| DecodeError::Base64 { field: "data", source })
	}
}

/// Patient identifier attached to a stored message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientId {
	/// Identifier value.
	#[serde(default)]
	pub value: String,
	/// Assigning authority or identifier type.
	#[serde(default)]
	pub r#type: String,
}

/// Page returned by `list`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
	/// Messages on this page (names only unless a view was requested).
	#[serde(default, rename = "hl7V2Messages")]
	pub hl7_v2_messages: Vec<Message>,
	/// Opaque cursor for the next page; not followed by the client.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_page_token: Option<String>,
}

/// Body of a `messages:ingest` call.
#[derive(Clone, Debug, Serialize)]
pub struct IngestMessageRequest {
	/// Message to store.
	pub message: IngestMessage,
}

/// Message payload inside [`IngestMessageRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct IngestMessage {
	/// Base64-encoded raw message.
	pub data: String,
	/// Labels attached to the stored message; always empty when built by this crate.
	pub labels: BTreeMap<String, String>,
}

/// Response of a `messages:ingest` call.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestMessageResponse {
	/// Base64-encoded acknowledgement produced by the store.
	#[serde(default)]
	pub hl7_ack: String,
	/// The stored message resource.
	#[serde(default)]
	pub message: Option<Message>,
}
impl IngestMessageResponse {
	/// Decodes the acknowledgement and extracts the stored resource name.
	pub fn into_send_result(self) -> Result<SendResult, DecodeError> {
		let ack = STANDARD
			.decode(&self.hl7_ack)
			.map_err(|source| DecodeError::Base64 { field: "hl7Ack", source })?;
		let name = self.message.map(|m| m.name).ok_or(DecodeError::MissingField { field: "message" })?;

		Ok(SendResult { ack, name })
	}
}

/// Raw payload headed for `send`, labeled with nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
	bytes: Vec<u8>,
	labels: BTreeMap<String, String>,
}
impl OutboundMessage {
	/// Wraps raw message bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self { bytes: bytes.into(), labels: BTreeMap::new() }
	}

	/// Raw message bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// SHA-256 of the payload, base64 without padding; used to correlate duplicate ingests.
	pub fn digest(&self) -> String {
		payload_digest(&self.bytes)
	}

	/// Builds the ingest request body.
	pub fn into_request(self) -> IngestMessageRequest {
		IngestMessageRequest {
			message: IngestMessage { data: STANDARD.encode(&self.bytes), labels: self.labels },
		}
	}
}

/// Outcome of a successful `send`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendResult {
	/// Decoded acknowledgement bytes, unmodified.
	pub ack: Vec<u8>,
	/// Resource name of the stored message.
	pub name: String,
}

/// SHA-256 of `bytes`, base64 without padding.
pub fn payload_digest(bytes: &[u8]) -> String {
	base64::engine::general_purpose::STANDARD_NO_PAD.encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outbound_message_encodes_data_with_empty_labels() {
		let body = serde_json::to_value(OutboundMessage::new(b"MSH|^~\\&|A".to_vec()).into_request())
			.expect("Ingest request should serialize.");

		assert_eq!(body, serde_json::json!({ "message": { "data": "TVNIfF5+XCZ8QQ==", "labels": {} } }));
	}

	#[test]
	fn ingest_response_requires_message_name() {
		let response: IngestMessageResponse =
			serde_json::from_str(r#"{"hl7Ack":"QUNL"}"#).expect("Response should parse.");
		let err = response.into_send_result().expect_err("Missing message must be rejected.");

		assert!(matches!(err, DecodeError::MissingField { field: "message" }));
	}

	#[test]
	fn ingest_response_rejects_bad_base64() {
		let response: IngestMessageResponse =
			serde_json::from_str(r#"{"hl7Ack":"***","message":{"name":"n"}}"#)
				.expect("Response should parse.");
		let err = response.into_send_result().expect_err("Bad base64 must be rejected.");

		assert!(matches!(err, DecodeError::Base64 { field: "hl7Ack", .. }));
	}

	#[test]
	fn list_response_keeps_page_token() {
		let page: ListMessagesResponse = serde_json::from_str(
			r#"{"hl7V2Messages":[{"name":"a"},{"name":"b"}],"nextPageToken":"tok"}"#,
		)
		.expect("List page should parse.");

		assert_eq!(page.hl7_v2_messages.len(), 2);
		assert_eq!(page.next_page_token.as_deref(), Some("tok"));
	}

	#[test]
	fn digest_is_stable() {
		assert_eq!(payload_digest(b"abc"), payload_digest(b"abc"));
		assert_ne!(payload_digest(b"abc"), payload_digest(b"abd"));
		assert_eq!(payload_digest(b"").len(), 43);
	}
}
