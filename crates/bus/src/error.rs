use thiserror::Error;

/// Errors reported by the explicit (non-dropping) send path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
	#[error("queue full")]
	QueueFull,

	#[error("connection closed")]
	Closed,
}

#[derive(Error, Debug)]
pub enum PublishError {
	#[error("Failed to serialize message: {0}")]
	Serialize(#[from] serde_json::Error),

	#[error("queue full")]
	QueueFull,

	#[error("connection closed")]
	Closed,
}

impl From<BusError> for PublishError {
	fn from(e: BusError) -> Self {
		match e {
			BusError::QueueFull => PublishError::QueueFull,
			BusError::Closed => PublishError::Closed,
		}
	}
}
