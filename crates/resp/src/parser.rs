//! Incremental RESP parser over an append-only byte accumulator.

use bytes::Buf;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::ParseError;
use crate::error::RespError;
use crate::types::RespValue;
use crate::utils::*;

/// Arrays nested deeper than this are treated as corrupt input.
const MAX_DEPTH: usize = 512;

/// Result of a parsing attempt.
#[derive(Debug)]
pub enum RespParseResult {
	/// A complete RESP value was parsed and its bytes were consumed.
	Complete(RespValue),
	/// The buffer does not contain enough data to parse a complete value.
	/// Nothing was consumed.
	Incomplete,
	/// The stream is corrupt. The caller should drop the connection.
	Error(RespError),
}

/// A stateful RESP parser that supports streaming.
///
/// Bytes are appended with [`provide`](Self::provide) as they arrive and
/// [`parse`](Self::parse) is called in a loop until it reports
/// [`RespParseResult::Incomplete`], since one read may carry several values.
/// A value is decoded from the start of the accumulator each time, and the
/// accumulator is only advanced once a whole top-level value is available,
/// so a partial frame is never half-consumed.
#[derive(Debug, Default)]
pub struct RespParser {
	buffer: BytesMut,
}

type Parsed = Result<Option<(RespValue, usize)>, ParseError>;

impl RespParser {
	pub fn new() -> Self {
		Self {
			buffer: BytesMut::new(),
		}
	}

	/// Append bytes received from the network.
	pub fn provide(&mut self, data: &[u8]) {
		self.buffer.extend_from_slice(data);
	}

	/// Discard all pending bytes, e.g. when a new connection starts.
	pub fn reset(&mut self) {
		self.buffer.clear();
	}

	/// Number of bytes waiting to be parsed.
	pub fn buffered_len(&self) -> usize {
		self.buffer.len()
	}

	/// Whether enough bytes are buffered to possibly hold a value: an
	/// opcode, at least one body byte and the separator.
	pub fn has_data(&self) -> bool {
		self.buffer.len() > 3
	}

	/// Try to parse one RESP value from the accumulated bytes.
	pub fn parse(&mut self) -> RespParseResult {
		match parse_value(&self.buffer, 0, 0) {
			Ok(Some((value, consumed))) => {
				self.buffer.advance(consumed);
				RespParseResult::Complete(value)
			}
			Ok(None) => RespParseResult::Incomplete,
			Err(e) => RespParseResult::Error(RespError::Parse(e)),
		}
	}
}

fn parse_value(buf: &[u8], offset: usize, depth: usize) -> Parsed {
	let Some(&type_marker) = buf.get(offset) else {
		return Ok(None);
	};

	match type_marker {
		SIMPLE_STRING => parse_line(buf, offset, RespValue::SimpleString),
		ERROR => parse_line(buf, offset, RespValue::Error),
		INTEGER => parse_integer(buf, offset),
		BULK_STRING => parse_bulk_string(buf, offset),
		ARRAY => parse_array(buf, offset, depth),
		_ => Err(ParseError::InvalidTypeMarker(type_marker as char)),
	}
}

fn parse_line(buf: &[u8], offset: usize, make: fn(Bytes) -> RespValue) -> Parsed {
	Ok(peek_line(buf, offset + 1)
		.map(|(line, next)| (make(Bytes::copy_from_slice(line)), next)))
}

fn parse_integer(buf: &[u8], offset: usize) -> Parsed {
	match peek_line(buf, offset + 1) {
		Some((line, next)) => {
			let num = crate::utils::parse_integer(line)?;
			Ok(Some((RespValue::Integer(num), next)))
		}
		None => Ok(None),
	}
}

/// Reads the `<len>\r\n` header shared by bulk strings and arrays.
/// Returns `None` for an unterminated header.
fn parse_length(buf: &[u8], offset: usize) -> Result<Option<(i64, usize)>, ParseError> {
	match peek_line(buf, offset + 1) {
		Some((line, next)) => Ok(Some((crate::utils::parse_integer(line)?, next))),
		None => Ok(None),
	}
}

fn parse_bulk_string(buf: &[u8], offset: usize) -> Parsed {
	// $6\r\nfoobar\r\n
	let Some((length, start)) = parse_length(buf, offset)? else {
		return Ok(None);
	};

	if length == -1 {
		return Ok(Some((RespValue::BulkString(None), start)));
	}
	if !(0..=MAX_BULK_LEN).contains(&length) {
		return Err(ParseError::InvalidBulkStringLength(length));
	}

	// The length is authoritative; CRLF inside the body is data.
	let end = start + length as usize;
	if buf.len() < end + CRLF.len() {
		return Ok(None);
	}
	if &buf[end..end + CRLF.len()] != CRLF {
		return Err(ParseError::InvalidFormat(
			"Missing CRLF after bulk string".to_string(),
		));
	}

	let data = Bytes::copy_from_slice(&buf[start..end]);
	Ok(Some((RespValue::BulkString(Some(data)), end + CRLF.len())))
}

fn parse_array(buf: &[u8], offset: usize, depth: usize) -> Parsed {
	if depth >= MAX_DEPTH {
		return Err(ParseError::InvalidFormat(format!(
			"Array nesting exceeds {} levels",
			MAX_DEPTH
		)));
	}

	let Some((length, mut next)) = parse_length(buf, offset)? else {
		return Ok(None);
	};

	if length == -1 {
		return Ok(Some((RespValue::Array(None), next)));
	}
	if length < -1 {
		return Err(ParseError::InvalidArrayLength(length));
	}

	// Do not trust the announced count for preallocation; every element
	// needs at least three bytes.
	let capacity = (length as usize).min(buf.len().saturating_sub(next) / 3);
	let mut elements = Vec::with_capacity(capacity);
	for _ in 0..length {
		match parse_value(buf, next, depth + 1)? {
			Some((value, after)) => {
				elements.push(value);
				next = after;
			}
			None => return Ok(None),
		}
	}

	Ok(Some((RespValue::Array(Some(elements)), next)))
}

/// Convenience function for one-off parsing.
///
/// Parses one value from the front of `buf` and consumes it. A buffer that
/// holds only part of a value yields [`ParseError::UnexpectedEOF`] and is
/// left untouched. If streaming is needed, use `RespParser` directly.
pub fn parse(buf: &mut BytesMut) -> Result<RespValue, ParseError> {
	match parse_value(buf, 0, 0)? {
		Some((value, consumed)) => {
			buf.advance(consumed);
			Ok(value)
		}
		None => Err(ParseError::UnexpectedEOF),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn bulk(s: &'static str) -> RespValue {
		RespValue::bulk_string(s)
	}

	#[test]
	fn test_parse_simple_string() {
		let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::simple_string("OK"));
		assert!(buf.is_empty());
	}

	#[test]
	fn test_parse_error() {
		let mut buf = BytesMut::from(&b"-ERR unknown command\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::error("ERR unknown command"));
	}

	#[rstest]
	#[case(b":1000\r\n", 1000)]
	#[case(b":-42\r\n", -42)]
	#[case(b":0\r\n", 0)]
	fn test_parse_integer(#[case] input: &[u8], #[case] expected: i64) {
		let mut buf = BytesMut::from(input);
		assert_eq!(parse(&mut buf).unwrap(), RespValue::Integer(expected));
	}

	#[test]
	fn test_parse_bulk_string() {
		let mut buf = BytesMut::from(&b"$6\r\nfoobar\r\n"[..]);
		assert_eq!(parse(&mut buf).unwrap(), bulk("foobar"));
	}

	#[test]
	fn test_parse_null_and_empty_bulk_string() {
		let mut buf = BytesMut::from(&b"$-1\r\n$0\r\n\r\n"[..]);
		assert_eq!(parse(&mut buf).unwrap(), RespValue::null_bulk_string());
		assert_eq!(parse(&mut buf).unwrap(), bulk(""));
		assert!(buf.is_empty());
	}

	#[test]
	fn test_parse_bulk_string_with_embedded_crlf() {
		let mut buf = BytesMut::from(&b"$14\r\nHello\r\n\r\nWorld\r\n"[..]);
		assert_eq!(parse(&mut buf).unwrap(), bulk("Hello\r\n\r\nWorld"));
		assert!(buf.is_empty());
	}

	#[test]
	fn test_parse_array() {
		let mut buf = BytesMut::from(&b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n"[..]);
		let value = parse(&mut buf).unwrap();
		assert_eq!(value, RespValue::array(vec![bulk("foo"), bulk("bar")]));
	}

	#[test]
	fn test_parse_null_and_empty_array() {
		let mut buf = BytesMut::from(&b"*-1\r\n*0\r\n"[..]);
		assert_eq!(parse(&mut buf).unwrap(), RespValue::null_array());
		assert_eq!(parse(&mut buf).unwrap(), RespValue::array(vec![]));
	}

	#[test]
	fn test_parse_nested_array() {
		let mut buf = BytesMut::from(&b"*2\r\n*1\r\n:1\r\n*2\r\n+a\r\n$-1\r\n"[..]);
		let expected = RespValue::array(vec![
			RespValue::array(vec![RespValue::integer(1)]),
			RespValue::array(vec![RespValue::simple_string("a"), RespValue::null_bulk_string()]),
		]);
		assert_eq!(parse(&mut buf).unwrap(), expected);
	}

	#[rstest]
	#[case(b"")]
	#[case(b"+OK")]
	#[case(b"+OK\r")]
	#[case(b":12")]
	#[case(b"$5\r\nhel")]
	#[case(b"$5\r\nhello")]
	#[case(b"$5\r\nhello\r")]
	#[case(b"*2\r\n$3\r\nfoo\r\n")]
	#[case(b"*2\r\n*1\r\n")]
	fn test_incomplete_leaves_buffer_untouched(#[case] input: &[u8]) {
		let mut parser = RespParser::new();
		parser.provide(input);
		assert!(matches!(parser.parse(), RespParseResult::Incomplete));
		assert_eq!(parser.buffered_len(), input.len());
	}

	#[rstest]
	#[case(b"^", "Invalid type marker")]
	#[case(b"%1\r\n", "Invalid type marker")]
	#[case(b"PING\r\n", "Invalid type marker")]
	#[case(b":abc\r\n", "Invalid integer")]
	#[case(b":\r\n", "Invalid integer")]
	#[case(b"$x\r\n", "Invalid integer")]
	#[case(b"*y\r\n", "Invalid integer")]
	#[case(b"$-2\r\n", "Invalid bulk string length")]
	#[case(b"*-5\r\n", "Invalid array length")]
	#[case(b"$3\r\nfooXY", "Missing CRLF")]
	fn test_corruption_is_fatal(#[case] input: &[u8], #[case] error_msg_part: &str) {
		let mut parser = RespParser::new();
		parser.provide(input);
		match parser.parse() {
			RespParseResult::Error(e) => assert!(
				e.to_string().contains(error_msg_part),
				"Expected error containing '{}', got {}",
				error_msg_part,
				e
			),
			other => panic!("Expected Error, got {:?}", other),
		}
	}

	#[test]
	fn test_corruption_inside_incomplete_array_is_fatal() {
		let mut parser = RespParser::new();
		// Second element is corrupt and the third has not arrived yet.
		parser.provide(b"*3\r\n:1\r\n:oops\r\n");
		assert!(matches!(parser.parse(), RespParseResult::Error(_)));
	}

	#[test]
	fn test_shortage_before_corruption_is_incomplete() {
		let mut parser = RespParser::new();
		parser.provide(b"*2\r\n$5\r\nhel");
		assert!(matches!(parser.parse(), RespParseResult::Incomplete));
	}

	#[test]
	fn test_oversized_bulk_string_rejected() {
		let mut buf = BytesMut::from(&b"$600000000\r\n"[..]);
		assert_eq!(
			parse(&mut buf),
			Err(ParseError::InvalidBulkStringLength(600_000_000))
		);
	}

	#[test]
	fn test_nesting_limit() {
		let mut input = Vec::new();
		for _ in 0..=MAX_DEPTH {
			input.extend_from_slice(b"*1\r\n");
		}
		input.extend_from_slice(b":1\r\n");
		let mut buf = BytesMut::from(&input[..]);
		assert!(matches!(parse(&mut buf), Err(ParseError::InvalidFormat(_))));
	}

	#[test]
	fn test_values_after_complete_one_remain() {
		let mut parser = RespParser::new();
		parser.provide(b"+OK\r\n+");
		assert!(matches!(
			parser.parse(),
			RespParseResult::Complete(RespValue::SimpleString(_))
		));
		assert!(matches!(parser.parse(), RespParseResult::Incomplete));
		assert_eq!(parser.buffered_len(), 1);
	}

	#[test]
	fn test_reset_discards_partial_frame() {
		let mut parser = RespParser::new();
		parser.provide(b"$10\r\nhalf");
		assert!(matches!(parser.parse(), RespParseResult::Incomplete));

		parser.reset();
		assert_eq!(parser.buffered_len(), 0);

		parser.provide(b":7\r\n");
		assert!(matches!(
			parser.parse(),
			RespParseResult::Complete(RespValue::Integer(7))
		));
	}

	#[test]
	fn test_has_data() {
		let mut parser = RespParser::new();
		parser.provide(b"+OK");
		assert!(!parser.has_data());
		parser.provide(b"\r\n");
		assert!(parser.has_data());
	}
}
