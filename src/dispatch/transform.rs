//! Payload preparation applied before each send.

// crates.io
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::_prelude::*;

/// Segment identifier of the dispatch trailer.
pub const TRAILER_SEGMENT: &str = "ZAC";

const TRAILER_STAMP: &[BorrowedFormatItem<'static>] = format_description!(
	"[year][month][day][hour][minute][second].[subsecond digits:7]"
);

/// Normalizes line endings to the HL7 segment terminator `\r`.
///
/// `\r\n` and lone `\n` both become `\r`; trailing blank segments collapse into one
/// terminator.
pub fn sanitize(payload: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(payload.len() + 1);
	let mut iter = payload.iter().copied().peekable();

	while let Some(byte) = iter.next() {
		match byte {
			b'\r' => {
				if iter.peek() == Some(&b'\n') {
					iter.next();
				}

				out.push(b'\r');
			},
			b'\n' => out.push(b'\r'),
			other => out.push(other),
		}
	}

	while out.ends_with(b"\r\r") {
		out.pop();
	}

	out
}

/// Appends a `ZAC|<timestamp>` segment so each dispatch produces a distinct message.
pub fn append_trailer(payload: &[u8], at: OffsetDateTime) -> Result<Vec<u8>, time::error::Format> {
	let stamp = at.format(TRAILER_STAMP)?;
	let mut out = payload.to_vec();

	if !out.is_empty() && !out.ends_with(b"\r") {
		out.push(b'\r');
	}

	out.extend_from_slice(TRAILER_SEGMENT.as_bytes());
	out.push(b'|');
	out.extend_from_slice(stamp.as_bytes());

	Ok(out)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn sanitize_normalizes_line_endings() {
		assert_eq!(sanitize(b"MSH|a\r\nPID|1\nPV1|2\r\n\r\n"), b"MSH|a\rPID|1\rPV1|2\r");
		assert_eq!(sanitize(b"MSH|a"), b"MSH|a");
	}

	#[test]
	fn trailer_is_a_new_segment_with_seven_fraction_digits() {
		let at = macros::datetime!(2024-03-05 06:07:08.123_456_789 UTC);
		let out = append_trailer(b"MSH|a", at).expect("Timestamp should format.");

		assert_eq!(out, b"MSH|a\rZAC|20240305060708.1234567");

		let out = append_trailer(b"MSH|a\r", at).expect("Timestamp should format.");

		assert_eq!(out, b"MSH|a\rZAC|20240305060708.1234567");
	}
}
