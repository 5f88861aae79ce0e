//! Minimal HL7v2 segment parser, enough to read MSH and MSA from an acknowledgement.

// self
use crate::_prelude::*;

/// Why a byte buffer is not a well-formed HL7v2 message.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ParseError {
	/// No segments at all.
	#[error("Acknowledgement is empty.")]
	Empty,
	/// The first segment is not `MSH`.
	#[error("Acknowledgement does not start with an MSH segment.")]
	MissingHeader,
	/// The MSH segment lacks its field separator or encoding characters.
	#[error("MSH segment is malformed: {reason}.")]
	InvalidHeader {
		/// What was wrong with the header.
		reason: &'static str,
	},
}

/// One segment: its identifier and its fields, split on the message's field separator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
	fields: Vec<String>,
	is_header: bool,
}
impl Segment {
	/// Three-letter segment identifier.
	pub fn id(&self) -> &str {
		self.fields.first().map(String::as_str).unwrap_or_default()
	}

	/// Returns field `n` using HL7 numbering.
	///
	/// For MSH, field 1 is the separator itself, so MSH-n (n >= 2) is split index n - 1. For
	/// every other segment, field n is split index n.
	pub fn field(&self, n: usize) -> Option<&str> {
		let idx = if self.is_header { n.checked_sub(1)? } else { n };

		if idx == 0 {
			return None;
		}

		self.fields.get(idx).map(String::as_str).filter(|value| !value.is_empty())
	}
}

/// A parsed HL7v2 message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hl7Message {
	segments: Vec<Segment>,
	field_separator: char,
	component_separator: char,
}
impl Hl7Message {
	/// Parses raw bytes. Line endings may be `\r`, `\n`, or `\r\n`; blank lines are skipped.
	pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
		let text = String::from_utf8_lossy(bytes);
		let mut lines = text
			.split(['\r', '\n'])
			.map(|line| line.trim_start_matches('\u{feff}'))
			.filter(|line| !line.trim().is_empty());
		let header = lines.next().ok_or(ParseError::Empty)?;

		if !header.starts_with("MSH") {
			return Err(ParseError::MissingHeader);
		}

		let field_separator = header
			.chars()
			.nth(3)
			.ok_or(ParseError::InvalidHeader { reason: "missing field separator" })?;

		if field_separator.is_alphanumeric() {
			return Err(ParseError::InvalidHeader { reason: "field separator is alphanumeric" });
		}

		let header_fields = split(header, field_separator);
		let encoding = header_fields
			.get(1)
			.filter(|value| !value.is_empty())
			.ok_or(ParseError::InvalidHeader { reason: "missing encoding characters" })?;
		let component_separator = encoding.chars().next().unwrap_or('^');
		let mut segments = vec![Segment { fields: header_fields, is_header: true }];

		segments.extend(
			lines.map(|line| Segment { fields: split(line, field_separator), is_header: false }),
		);

		Ok(Self { segments, field_separator, component_separator })
	}

	/// All segments in order.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// First segment with the given identifier.
	pub fn segment(&self, id: &str) -> Option<&Segment> {
		self.segments.iter().find(|segment| segment.id() == id)
	}

	/// The MSH segment.
	pub fn header(&self) -> &Segment {
		&self.segments[0]
	}

	/// Field separator declared in MSH.
	pub fn field_separator(&self) -> char {
		self.field_separator
	}

	/// Returns component `n` (1-based) of `value`.
	pub fn component<'a>(&self, value: &'a str, n: usize) -> Option<&'a str> {
		value.split(self.component_separator).nth(n.checked_sub(1)?).filter(|c| !c.is_empty())
	}
}

fn split(line: &str, separator: char) -> Vec<String> {
	line.split(separator).map(str::to_owned).collect()
}
