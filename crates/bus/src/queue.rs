use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Push without waiting. A full queue drops `item` (the newest) and keeps
/// what is already queued; returns whether the item was accepted.
pub(crate) fn offer<T>(tx: &mpsc::Sender<T>, item: T, queue: &'static str) -> bool {
	match tx.try_send(item) {
		Ok(()) => true,
		Err(TrySendError::Full(_)) => {
			warn!(
				queue,
				capacity = tx.max_capacity(),
				"Queue full, dropping newest item"
			);
			false
		}
		Err(TrySendError::Closed(_)) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_full_queue_drops_newest() {
		let (tx, mut rx) = mpsc::channel(3);
		for i in 0..5 {
			let accepted = offer(&tx, i, "test");
			assert_eq!(accepted, i < 3);
		}
		assert_eq!(tx.capacity(), 0);

		let mut drained = Vec::new();
		while let Ok(item) = rx.try_recv() {
			drained.push(item);
		}
		assert_eq!(drained, vec![0, 1, 2]);
	}

	#[tokio::test]
	async fn test_closed_queue_rejects() {
		let (tx, rx) = mpsc::channel::<u8>(1);
		drop(rx);
		assert!(!offer(&tx, 1, "test"));
	}
}
