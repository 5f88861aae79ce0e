//! Acknowledgement classification.
//!
//! A send only counts as delivered once the acknowledgement it returned classifies as
//! [`AckOutcome::Accepted`]. The decision keys on the MSH-9 message type alone: `ACK` is
//! accepted, `NACK` is rejected, and anything else is malformed. MSA-1 is exposed for
//! diagnostics but does not change the outcome.

pub mod parse;

pub use parse::*;

// self
use crate::{_prelude::*, error::AckError};

/// Classification of an acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AckOutcome {
	/// Message type `ACK`.
	Accepted,
	/// Message type `NACK`.
	Rejected,
	/// Any other message type.
	Malformed,
}
impl AckOutcome {
	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Accepted => "accepted",
			Self::Rejected => "rejected",
			Self::Malformed => "malformed",
		}
	}
}
impl Display for AckOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fields read from an acknowledgement message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acknowledgement {
	/// MSH-9.1 message type.
	pub message_type: String,
	/// MSH-9.2 trigger event.
	pub trigger_event: Option<String>,
	/// MSA-1 acknowledgement code (`AA`, `AE`, `AR`, ...).
	pub ack_code: Option<String>,
	/// MSA-2 control id of the acknowledged message.
	pub control_id: Option<String>,
	/// MSA-3 free text.
	pub text: Option<String>,
}
impl Acknowledgement {
	/// Parses an acknowledgement.
	pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
		let message = Hl7Message::parse(bytes)?;
		let msh9 = message.header().field(9).unwrap_or_default();
		let msa = message.segment("MSA");
		let msa_field = |n| msa.and_then(|segment| segment.field(n)).map(str::to_owned);

		Ok(Self {
			message_type: message.component(msh9, 1).unwrap_or_default().to_owned(),
			trigger_event: message.component(msh9, 2).map(str::to_owned),
			ack_code: msa_field(1),
			control_id: msa_field(2),
			text: msa_field(3),
		})
	}

	/// Outcome implied by the message type.
	pub fn outcome(&self) -> AckOutcome {
		match self.message_type.as_str() {
			"ACK" => AckOutcome::Accepted,
			"NACK" => AckOutcome::Rejected,
			_ => AckOutcome::Malformed,
		}
	}
}

/// Classifies raw acknowledgement bytes.
pub fn classify(bytes: &[u8]) -> Result<AckOutcome, ParseError> {
	Ok(Acknowledgement::parse(bytes)?.outcome())
}

/// Parses and classifies, turning anything but [`AckOutcome::Accepted`] into an error.
pub fn check(bytes: &[u8]) -> Result<Acknowledgement> {
	let ack = Acknowledgement::parse(bytes).map_err(AckError::from)?;

	match ack.outcome() {
		AckOutcome::Accepted => Ok(ack),
		AckOutcome::Rejected => Err(AckError::NegativeAcknowledgement { text: ack.text }.into()),
		AckOutcome::Malformed =>
			Err(AckError::UnrecognizedAcknowledgement { message_type: ack.message_type }.into()),
	}
}
