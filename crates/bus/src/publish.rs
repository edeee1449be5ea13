use bytes::Bytes;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::PublishError;
use crate::Reconnecting;

/// Serializes values to JSON and publishes them through a connection.
///
/// Publishing never waits: a full command queue fails immediately with
/// [`PublishError::QueueFull`].
#[derive(Clone)]
pub struct Publisher {
	conn: Reconnecting,
}

impl Publisher {
	pub fn new(conn: Reconnecting) -> Self {
		Self { conn }
	}

	pub fn connection(&self) -> &Reconnecting {
		&self.conn
	}

	pub fn publish<T>(&self, channel: &str, value: &T) -> Result<(), PublishError>
	where
		T: Serialize + ?Sized,
	{
		let payload = serde_json::to_vec(value)?;
		self.publish_bytes(channel, &payload)
	}

	/// Publish `fields` with an added `"Event"` key naming the event.
	pub fn publish_with_event(
		&self,
		channel: &str,
		event: &str,
		fields: &Map<String, Value>,
	) -> Result<(), PublishError> {
		let mut body = fields.clone();
		body.insert("Event".to_string(), Value::String(event.to_string()));
		self.publish(channel, &body)
	}

	/// Publish an already encoded payload.
	pub fn publish_bytes(&self, channel: &str, payload: &[u8]) -> Result<(), PublishError> {
		let cmd: Bytes = resp::format_command([b"PUBLISH".as_slice(), channel.as_bytes(), payload]);
		self.conn.try_send(cmd)?;
		debug!(channel, bytes = payload.len(), "Published");
		Ok(())
	}
}
