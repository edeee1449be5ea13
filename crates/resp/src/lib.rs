//! # RESP - Redis Serialization Protocol codec
//!
//! An incremental RESP2 parser and encoder for long-lived client streams.
//!
//! The parser keeps its own byte accumulator: network reads are handed to
//! [`RespParser::provide`] in whatever chunks they arrive, and
//! [`RespParser::parse`] yields at most one complete value per call without
//! ever blocking. Nothing is consumed until a whole top-level value is
//! available.
//!
//! ## Example
//!
//! ```rust
//! use resp::RespEncoder;
//! use resp::RespParseResult;
//! use resp::RespParser;
//! use resp::RespValue;
//!
//! let mut parser = RespParser::new();
//! parser.provide(b"*2\r\n$7\r\nmess");
//! assert!(matches!(parser.parse(), RespParseResult::Incomplete));
//!
//! parser.provide(b"age\r\n:42\r\n");
//! let value = match parser.parse() {
//!     RespParseResult::Complete(value) => value,
//!     other => panic!("unexpected {:?}", other),
//! };
//! assert_eq!(
//!     value,
//!     RespValue::array(vec![RespValue::bulk_string("message"), RespValue::integer(42)])
//! );
//! assert_eq!(&value.encode()[..], b"*2\r\n$7\r\nmessage\r\n:42\r\n");
//! ```

mod command;
mod encode;
mod error;
mod parser;
mod types;
mod utils;

pub use command::command;
pub use command::format_command;
pub use command::format_command_to;
pub use command::write_command;
pub use encode::RespEncoder;
pub use error::ParseError;
pub use error::RespError;
pub use parser::RespParseResult;
pub use parser::RespParser;
pub use parser::parse;
pub use types::RespKind;
pub use types::RespValue;
