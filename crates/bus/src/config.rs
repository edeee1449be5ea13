use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Tuning for a [`Reconnecting`](crate::Reconnecting) connection.
///
/// Durations are in milliseconds so the struct maps directly onto TOML,
/// JSON or YAML configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
	/// Upstream `host:port`.
	pub addr: String,
	pub dial_timeout_ms: u64,
	/// How often the supervisor checks whether it needs to reconnect.
	pub reconnect_poll_ms: u64,
	pub min_backoff_ms: u64,
	pub max_backoff_ms: u64,
	pub health_check_interval_ms: u64,
	/// Silence longer than this many health-check intervals kills the
	/// connection.
	pub dead_after_intervals: u32,
	pub read_buffer_size: usize,
	pub command_queue_size: usize,
	pub data_queue_size: usize,
	pub message_queue_size: usize,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self {
			addr: "bus:6379".into(),
			dial_timeout_ms: 10_000,
			reconnect_poll_ms: 1_000,
			min_backoff_ms: 1_000,
			max_backoff_ms: 30_000,
			health_check_interval_ms: 5_000,
			dead_after_intervals: 4,
			read_buffer_size: 16 * 1024,
			command_queue_size: 255,
			data_queue_size: 255,
			message_queue_size: 255,
		}
	}
}

impl ConnectionConfig {
	pub fn new(addr: impl Into<String>) -> Self {
		Self {
			addr: addr.into(),
			..Self::default()
		}
	}

	pub fn dial_timeout(&self) -> Duration {
		Duration::from_millis(self.dial_timeout_ms)
	}

	pub fn reconnect_poll(&self) -> Duration {
		Duration::from_millis(self.reconnect_poll_ms.max(1))
	}

	pub fn min_backoff(&self) -> Duration {
		Duration::from_millis(self.min_backoff_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_millis(self.max_backoff_ms.max(self.min_backoff_ms))
	}

	pub fn health_check_interval(&self) -> Duration {
		Duration::from_millis(self.health_check_interval_ms.max(1))
	}

	/// Idle time after which the connection is considered dead.
	pub fn dead_after(&self) -> Duration {
		self.health_check_interval() * self.dead_after_intervals.max(1)
	}
}
