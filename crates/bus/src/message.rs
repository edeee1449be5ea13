//! Classification of decoded server pushes into bus messages.

use bytes::Bytes;
use resp::RespValue;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

/// A message published on a channel the client is subscribed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusMessage {
	pub channel: String,
	/// The matching pattern for `pmessage` deliveries, empty otherwise.
	pub pattern: String,
	pub data: Bytes,
}

impl BusMessage {
	pub fn is_pattern(&self) -> bool {
		!self.pattern.is_empty()
	}

	/// Decode the payload as a JSON object.
	pub fn into_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
		self.decode()
	}

	/// Decode the payload as JSON into any deserializable type.
	pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		serde_json::from_slice(&self.data)
	}
}

/// Message-type tag carried in the first element of a push array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
	Message,
	PMessage,
	Pong,
}

impl MessageKind {
	pub fn from_tag(tag: &[u8]) -> Option<Self> {
		match tag {
			b"message" => Some(MessageKind::Message),
			b"pmessage" => Some(MessageKind::PMessage),
			b"pong" => Some(MessageKind::Pong),
			_ => None,
		}
	}

	pub fn tag(self) -> &'static str {
		match self {
			MessageKind::Message => "message",
			MessageKind::PMessage => "pmessage",
			MessageKind::Pong => "pong",
		}
	}
}

fn bulk(value: &RespValue) -> Option<&Bytes> {
	match value {
		RespValue::BulkString(Some(b)) => Some(b),
		_ => None,
	}
}

fn text(value: &RespValue) -> Option<String> {
	bulk(value).map(|b| String::from_utf8_lossy(b).into_owned())
}

fn kind_of(value: &RespValue) -> Option<(MessageKind, &[RespValue])> {
	let (tag, rest) = value.as_array()?.split_first()?;
	Some((MessageKind::from_tag(bulk(tag)?)?, rest))
}

/// Whether `value` is the reply to a `PING` sent while subscribed.
pub fn is_pong(value: &RespValue) -> bool {
	matches!(kind_of(value), Some((MessageKind::Pong, _)))
}

/// Map a decoded value to a [`BusMessage`].
///
/// Only `["message", channel, payload]` and
/// `["pmessage", pattern, channel, payload]` arrays of bulk strings are
/// accepted. Anything else (subscribe confirmations, pongs, wrong arity, a
/// null or non-bulk element) returns `None`; that is a normal occurrence on
/// a subscribed connection, not an error.
pub fn parse_message(value: &RespValue) -> Option<BusMessage> {
	match kind_of(value)? {
		(MessageKind::Message, [channel, data]) => Some(BusMessage {
			channel: text(channel)?,
			pattern: String::new(),
			data: bulk(data)?.clone(),
		}),
		(MessageKind::PMessage, [pattern, channel, data]) => Some(BusMessage {
			channel: text(channel)?,
			pattern: text(pattern)?,
			data: bulk(data)?.clone(),
		}),
		_ => None,
	}
}
