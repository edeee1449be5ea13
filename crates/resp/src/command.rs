//! Outbound command formatting: a command is an array of bulk strings.

use std::io;

use bytes::Bytes;
use bytes::BytesMut;

use crate::RespEncoder;
use crate::RespValue;

/// Build the RESP array for a command and its arguments.
pub fn command<I, A>(args: I) -> RespValue
where
	I: IntoIterator<Item = A>,
	A: AsRef<[u8]>,
{
	RespValue::array(
		args.into_iter()
			.map(|arg| RespValue::bulk_string(Bytes::copy_from_slice(arg.as_ref()))),
	)
}

/// Encode a command into wire bytes.
///
/// ```rust
/// let cmd = resp::format_command(["SUBSCRIBE", "news"]);
/// assert_eq!(&cmd[..], b"*2\r\n$9\r\nSUBSCRIBE\r\n$4\r\nnews\r\n");
/// ```
pub fn format_command<I, A>(args: I) -> Bytes
where
	I: IntoIterator<Item = A>,
	A: AsRef<[u8]>,
{
	let mut buf = BytesMut::new();
	format_command_to(&mut buf, args);
	buf.freeze()
}

/// Append an encoded command to `buf`.
pub fn format_command_to<I, A>(buf: &mut BytesMut, args: I)
where
	I: IntoIterator<Item = A>,
	A: AsRef<[u8]>,
{
	command(args).encode_to(buf);
}

/// Write an encoded command to a blocking sink.
pub fn write_command<W, I, A>(w: &mut W, args: I) -> io::Result<()>
where
	W: io::Write,
	I: IntoIterator<Item = A>,
	A: AsRef<[u8]>,
{
	command(args).write_to(w)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_ping() {
		assert_eq!(format_command(["PING"]), b"*1\r\n$4\r\nPING\r\n".as_slice());
	}

	#[test]
	fn test_format_publish_with_binary_payload() {
		let payload: &[u8] = b"a\r\nb";
		let cmd = format_command([b"PUBLISH".as_slice(), b"ch".as_slice(), payload]);
		assert_eq!(
			cmd,
			b"*3\r\n$7\r\nPUBLISH\r\n$2\r\nch\r\n$4\r\na\r\nb\r\n".as_slice()
		);
	}

	#[test]
	fn test_format_command_to_appends() {
		let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
		format_command_to(&mut buf, vec!["PING".to_string(), "x".to_string()]);
		assert_eq!(&buf[..], b"+OK\r\n*2\r\n$4\r\nPING\r\n$1\r\nx\r\n");
	}

	#[test]
	fn test_empty_command() {
		let args: [&str; 0] = [];
		assert_eq!(format_command(args), b"*0\r\n".as_slice());
	}

	#[test]
	fn test_write_command() {
		let mut out = Vec::new();
		write_command(&mut out, ["UNSUBSCRIBE", "news"]).unwrap();
		assert_eq!(out, b"*2\r\n$11\r\nUNSUBSCRIBE\r\n$4\r\nnews\r\n");
	}
}
