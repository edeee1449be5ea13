use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
	/// Exact channel name.
	Subscribe,
	/// Glob-style channel pattern.
	PSubscribe,
}

impl SubscriptionKind {
	pub fn command_name(self) -> &'static str {
		match self {
			SubscriptionKind::Subscribe => "SUBSCRIBE",
			SubscriptionKind::PSubscribe => "PSUBSCRIBE",
		}
	}

	pub fn unsubscribe_command_name(self) -> &'static str {
		match self {
			SubscriptionKind::Subscribe => "UNSUBSCRIBE",
			SubscriptionKind::PSubscribe => "PUNSUBSCRIBE",
		}
	}
}

/// A subscription remembered for replay after every reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconnectingChannel {
	pub channel: String,
	pub kind: SubscriptionKind,
}

impl ReconnectingChannel {
	pub fn subscribe_command(&self) -> Bytes {
		resp::format_command([self.kind.command_name(), self.channel.as_str()])
	}

	pub fn unsubscribe_command(&self) -> Bytes {
		resp::format_command([self.kind.unsubscribe_command_name(), self.channel.as_str()])
	}
}

/// Subscription records keyed by channel or pattern.
///
/// A key holds one kind at a time; the first registration wins.
#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
	channels: DashMap<String, SubscriptionKind>,
}

impl Subscriptions {
	/// Returns the record if the key was not present yet.
	pub(crate) fn insert(
		&self,
		channel: String,
		kind: SubscriptionKind,
	) -> Option<ReconnectingChannel> {
		match self.channels.entry(channel) {
			Entry::Occupied(_) => None,
			Entry::Vacant(vacant) => {
				let record = ReconnectingChannel {
					channel: vacant.key().clone(),
					kind,
				};
				vacant.insert(kind);
				Some(record)
			}
		}
	}

	/// Removes the key only when it is registered with `kind`.
	pub(crate) fn remove(
		&self,
		channel: &str,
		kind: SubscriptionKind,
	) -> Option<ReconnectingChannel> {
		self.channels
			.remove_if(channel, |_, existing| *existing == kind)
			.map(|(channel, kind)| ReconnectingChannel { channel, kind })
	}

	pub(crate) fn snapshot(&self) -> Vec<ReconnectingChannel> {
		self.channels
			.iter()
			.map(|entry| ReconnectingChannel {
				channel: entry.key().clone(),
				kind: *entry.value(),
			})
			.collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.channels.len()
	}
}
