//! Utility functions and constants for RESP protocol.

use memchr::memmem;

use crate::error::ParseError;

/// CRLF line ending
pub const CRLF: &[u8] = b"\r\n";

/// Type markers
pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

/// Largest bulk string a peer may announce (same ceiling as Redis).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Find the position of CRLF in a byte slice
#[inline]
pub fn find_crlf(buf: &[u8]) -> Option<usize> {
	memmem::find(buf, CRLF)
}

/// Return the line starting at `offset` (without CRLF) and the offset just
/// past its CRLF, or `None` if the line is not terminated yet.
#[inline]
pub fn peek_line(buf: &[u8], offset: usize) -> Option<(&[u8], usize)> {
	let rest = buf.get(offset..)?;
	find_crlf(rest).map(|pos| (&rest[..pos], offset + pos + CRLF.len()))
}

/// Parse an integer from a byte slice
#[inline]
pub fn parse_integer(buf: &[u8]) -> Result<i64, ParseError> {
	let s = std::str::from_utf8(buf)?;
	s.parse::<i64>()
		.map_err(|e| ParseError::InvalidInteger(format!("{:?}: {}", s, e)))
}
