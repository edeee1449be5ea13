//! RESP data types and value representation.

use std::fmt;

use bytes::Bytes;

/// Discriminant of a [`RespValue`], one per wire opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespKind {
	SimpleString,
	Error,
	Integer,
	BulkString,
	Array,
}

impl RespKind {
	pub fn name(self) -> &'static str {
		match self {
			RespKind::SimpleString => "SimpleString",
			RespKind::Error => "Error",
			RespKind::Integer => "Integer",
			RespKind::BulkString => "BulkString",
			RespKind::Array => "Array",
		}
	}
}

impl fmt::Display for RespKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Represents a RESP protocol value.
///
/// Bulk strings and arrays carry their null form as `None`, so a null bulk
/// string (`$-1\r\n`) never compares equal to an empty one (`$0\r\n\r\n`),
/// and likewise for arrays. Equality is structural and never crosses
/// variants: `Integer(42)` is not `SimpleString("42")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
	/// Simple string: `+OK\r\n`
	SimpleString(Bytes),

	/// Error: `-ERR message\r\n`
	Error(Bytes),

	/// Integer: `:1000\r\n`
	Integer(i64),

	/// Bulk string: `$6\r\nfoobar\r\n`, null: `$-1\r\n`
	BulkString(Option<Bytes>),

	/// Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`, null: `*-1\r\n`
	Array(Option<Vec<RespValue>>),
}

impl RespValue {
	pub fn kind(&self) -> RespKind {
		match self {
			RespValue::SimpleString(_) => RespKind::SimpleString,
			RespValue::Error(_) => RespKind::Error,
			RespValue::Integer(_) => RespKind::Integer,
			RespValue::BulkString(_) => RespKind::BulkString,
			RespValue::Array(_) => RespKind::Array,
		}
	}

	/// Check if the value is an error
	pub fn is_error(&self) -> bool {
		matches!(self, RespValue::Error(_))
	}

	/// Check if the value is a null bulk string or a null array
	pub fn is_null(&self) -> bool {
		matches!(self, RespValue::BulkString(None) | RespValue::Array(None))
	}

	/// Try to convert to a string slice
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	/// Try to convert to bytes
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			RespValue::SimpleString(b) | RespValue::BulkString(Some(b)) => Some(b),
			_ => None,
		}
	}

	/// Try to convert to integer
	pub fn as_integer(&self) -> Option<i64> {
		match self {
			RespValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Try to convert to array; `None` for null arrays too
	pub fn as_array(&self) -> Option<&[RespValue]> {
		match self {
			RespValue::Array(Some(a)) => Some(a),
			_ => None,
		}
	}

	/// Convert to String with lossy UTF-8 conversion
	pub fn to_string_lossy(&self) -> Option<String> {
		self.as_bytes()
			.map(|b| String::from_utf8_lossy(b).into_owned())
	}

	/// Try to consume and convert to Vec<RespValue>
	pub fn into_vec(self) -> Option<Vec<RespValue>> {
		match self {
			RespValue::Array(a) => a,
			_ => None,
		}
	}

	// Convenience constructors

	/// Create a simple string value
	pub fn simple_string(s: impl Into<Bytes>) -> Self {
		RespValue::SimpleString(s.into())
	}

	/// Create an error value
	pub fn error(e: impl Into<Bytes>) -> Self {
		RespValue::Error(e.into())
	}

	/// Create an integer value
	pub fn integer(i: i64) -> Self {
		RespValue::Integer(i)
	}

	/// Create a (non-null) bulk string value
	pub fn bulk_string(s: impl Into<Bytes>) -> Self {
		RespValue::BulkString(Some(s.into()))
	}

	/// Create a null bulk string
	pub fn null_bulk_string() -> Self {
		RespValue::BulkString(None)
	}

	/// Create a (non-null) array value from an iterator
	pub fn array(items: impl IntoIterator<Item = RespValue>) -> Self {
		RespValue::Array(Some(items.into_iter().collect()))
	}

	/// Create a null array
	pub fn null_array() -> Self {
		RespValue::Array(None)
	}
}

impl fmt::Display for RespValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RespValue::SimpleString(s) => write!(f, "{}", String::from_utf8_lossy(s)),
			RespValue::Error(e) => write!(f, "(error) {}", String::from_utf8_lossy(e)),
			RespValue::Integer(i) => write!(f, "{}", i),
			RespValue::BulkString(Some(b)) => write!(f, "{}", String::from_utf8_lossy(b)),
			RespValue::BulkString(None) | RespValue::Array(None) => f.write_str("<nil>"),
			RespValue::Array(Some(items)) => {
				f.write_str("[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(" ")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str("]")
			}
		}
	}
}

// Convenient From implementations
impl From<&str> for RespValue {
	fn from(s: &str) -> Self {
		RespValue::bulk_string(Bytes::copy_from_slice(s.as_bytes()))
	}
}

impl From<String> for RespValue {
	fn from(s: String) -> Self {
		RespValue::bulk_string(s)
	}
}

impl From<&[u8]> for RespValue {
	fn from(b: &[u8]) -> Self {
		RespValue::bulk_string(Bytes::copy_from_slice(b))
	}
}

impl From<Vec<u8>> for RespValue {
	fn from(v: Vec<u8>) -> Self {
		RespValue::bulk_string(v)
	}
}

impl From<Bytes> for RespValue {
	fn from(b: Bytes) -> Self {
		RespValue::bulk_string(b)
	}
}

impl From<i64> for RespValue {
	fn from(i: i64) -> Self {
		RespValue::Integer(i)
	}
}

impl<T: Into<RespValue>> From<Vec<T>> for RespValue {
	fn from(v: Vec<T>) -> Self {
		RespValue::array(v.into_iter().map(Into::into))
	}
}

impl<T: Into<RespValue>> From<Option<T>> for RespValue {
	fn from(o: Option<T>) -> Self {
		match o {
			Some(v) => v.into(),
			None => RespValue::BulkString(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[test]
	fn test_is_error() {
		let err = RespValue::error("ERR");
		assert!(err.is_error());

		let ok = RespValue::simple_string("OK");
		assert!(!ok.is_error());
	}

	#[test]
	fn test_as_str() {
		let val = RespValue::simple_string("hello");
		assert_eq!(val.as_str(), Some("hello"));

		let num = RespValue::Integer(42);
		assert_eq!(num.as_str(), None);

		assert_eq!(RespValue::null_bulk_string().as_str(), None);
	}

	#[test]
	fn test_kind() {
		assert_eq!(RespValue::simple_string("OK").kind(), RespKind::SimpleString);
		assert_eq!(RespValue::error("ERR").kind(), RespKind::Error);
		assert_eq!(RespValue::integer(1).kind(), RespKind::Integer);
		assert_eq!(RespValue::null_bulk_string().kind(), RespKind::BulkString);
		assert_eq!(RespValue::null_array().kind(), RespKind::Array);
		assert_eq!(RespKind::BulkString.to_string(), "BulkString");
	}

	#[rstest]
	#[case(RespValue::null_bulk_string(), RespValue::bulk_string(""))]
	#[case(RespValue::null_array(), RespValue::array(vec![]))]
	#[case(RespValue::integer(42), RespValue::simple_string("42"))]
	#[case(RespValue::simple_string("OK"), RespValue::error("OK"))]
	#[case(RespValue::simple_string("OK"), RespValue::bulk_string("OK"))]
	#[case(
		RespValue::array(vec![RespValue::integer(1)]),
		RespValue::array(vec![RespValue::integer(1), RespValue::integer(2)])
	)]
	#[case(
		RespValue::array(vec![RespValue::array(vec![RespValue::null_bulk_string()])]),
		RespValue::array(vec![RespValue::array(vec![RespValue::bulk_string("")])])
	)]
	fn test_structural_inequality(#[case] a: RespValue, #[case] b: RespValue) {
		assert_ne!(a, b);
		assert_ne!(b, a);
	}

	#[test]
	fn test_nested_equality() {
		let build = || {
			RespValue::array(vec![
				RespValue::bulk_string("message"),
				RespValue::array(vec![RespValue::integer(-1), RespValue::null_array()]),
				RespValue::null_bulk_string(),
			])
		};
		assert_eq!(build(), build());
	}

	#[test]
	fn test_display() {
		let val = RespValue::array(vec![
			RespValue::bulk_string("a"),
			RespValue::integer(3),
			RespValue::null_bulk_string(),
		]);
		assert_eq!(val.to_string(), "[a 3 <nil>]");
		assert_eq!(RespValue::error("ERR x").to_string(), "(error) ERR x");
		assert_eq!(RespValue::null_array().to_string(), "<nil>");
	}

	#[test]
	fn test_from_conversions() {
		let s: RespValue = "test".into();
		assert_eq!(s, RespValue::bulk_string("test"));

		let i: RespValue = 42i64.into();
		assert_eq!(i.as_integer(), Some(42));

		let none: RespValue = Option::<String>::None.into();
		assert!(none.is_null());

		let arr: RespValue = vec!["a", "b"].into();
		assert_eq!(arr.as_array().map(|a| a.len()), Some(2));
	}

	#[test]
	fn test_to_string_lossy() {
		let val = RespValue::bulk_string(&b"caf\xc3\xa9"[..]);
		assert_eq!(val.to_string_lossy(), Some("café".to_string()));

		let num = RespValue::integer(42);
		assert_eq!(num.to_string_lossy(), None);
	}

	#[test]
	fn test_into_vec() {
		let arr = RespValue::array(vec![RespValue::integer(1), RespValue::integer(2)]);
		assert_eq!(arr.into_vec().map(|v| v.len()), Some(2));
		assert_eq!(RespValue::null_array().into_vec(), None);
	}
}
