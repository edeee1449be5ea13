//! The reconnecting connection manager.
//!
//! Five long-lived tasks share one [`Shared`] state and talk only through
//! bounded queues:
//!
//! - the supervisor dials while disconnected and backs off on failure,
//! - the health check pings a quiet connection and kills a dead one,
//! - the send loop drains the command queue onto the live socket,
//! - the receive loop reads raw chunks off the socket of each epoch,
//! - the dispatch loop decodes chunks and forwards bus messages.
//!
//! Each successful dial starts a new epoch. Chunks are tagged with the
//! epoch they were read in so the decoder can drop a dead epoch's partial
//! frame before it sees bytes from the next one.

use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use bytes::Bytes;
use bytes::BytesMut;
use resp::RespParseResult;
use resp::RespParser;
use resp::RespValue;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;
use ulid::Ulid;

use crate::BusError;
use crate::BusMessage;
use crate::ConnectionConfig;
use crate::ReconnectingChannel;
use crate::SubscriptionKind;
use crate::message::is_pong;
use crate::message::parse_message;
use crate::queue::offer;
use crate::subscription::Subscriptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
	/// Terminal; entered only through [`Reconnecting::close`].
	Closed,
}

/// Handle to a self-healing pub/sub connection.
///
/// Cloning is cheap and every clone drives the same connection. The
/// background tasks keep running until [`close`](Self::close) is called.
#[derive(Clone)]
pub struct Reconnecting {
	shared: Arc<Shared>,
}

/// Receiving end of the bus message queue.
///
/// Yields `None` once the connection is closed and the queue is drained.
pub struct Messages {
	rx: mpsc::Receiver<BusMessage>,
}

impl Messages {
	pub async fn recv(&mut self) -> Option<BusMessage> {
		self.rx.recv().await
	}

	pub fn try_recv(&mut self) -> Option<BusMessage> {
		self.rx.try_recv().ok()
	}
}

/// Raw bytes read during one epoch.
struct Chunk {
	epoch: u64,
	data: Bytes,
}

/// The read side of a freshly dialled socket, handed to the receive loop.
struct EpochReader {
	epoch: u64,
	reader: OwnedReadHalf,
	killed: watch::Receiver<bool>,
}

struct EpochWriter {
	epoch: u64,
	writer: OwnedWriteHalf,
	killed: watch::Receiver<bool>,
}

struct Link {
	epoch: u64,
	/// Set to `true` to tear the current epoch down.
	kill: Option<watch::Sender<bool>>,
	last_data: Instant,
}

struct Shared {
	config: ConnectionConfig,
	subscriptions: Subscriptions,
	commands: mpsc::Sender<Bytes>,
	link: Mutex<Link>,
	writer: tokio::sync::Mutex<Option<EpochWriter>>,
	next_epoch: AtomicU64,
	state: watch::Sender<ConnectionState>,
	shutdown: watch::Sender<bool>,
}

enum WriteOutcome {
	Written,
	NotConnected,
	Failed,
}

impl Reconnecting {
	/// Start the connection tasks and return the handle plus the message
	/// receiver.
	///
	/// # Panics
	///
	/// Must be called from within a tokio runtime.
	pub fn new(config: ConnectionConfig) -> (Self, Messages) {
		let (commands_tx, commands_rx) = mpsc::channel(config.command_queue_size.max(1));
		let (data_tx, data_rx) = mpsc::channel(config.data_queue_size.max(1));
		let (messages_tx, messages_rx) = mpsc::channel(config.message_queue_size.max(1));
		let (epochs_tx, epochs_rx) = mpsc::channel(1);

		let shared = Arc::new(Shared {
			config,
			subscriptions: Subscriptions::default(),
			commands: commands_tx,
			link: Mutex::new(Link {
				epoch: 0,
				kill: None,
				last_data: Instant::now(),
			}),
			writer: tokio::sync::Mutex::new(None),
			next_epoch: AtomicU64::new(1),
			state: watch::Sender::new(ConnectionState::Disconnected),
			shutdown: watch::Sender::new(false),
		});

		tokio::spawn(supervise(shared.clone(), epochs_tx));
		tokio::spawn(health_check(shared.clone()));
		tokio::spawn(send_loop(shared.clone(), commands_rx));
		tokio::spawn(receive_loop(shared.clone(), epochs_rx, data_tx));
		tokio::spawn(dispatch_loop(shared.clone(), data_rx, messages_tx));

		(Self { shared }, Messages { rx: messages_rx })
	}

	pub fn subscribe<I, S>(&self, channels: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add(channels, SubscriptionKind::Subscribe);
	}

	pub fn psubscribe<I, S>(&self, patterns: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.add(patterns, SubscriptionKind::PSubscribe);
	}

	pub fn unsubscribe<I, S>(&self, channels: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.remove(channels, SubscriptionKind::Subscribe);
	}

	pub fn punsubscribe<I, S>(&self, patterns: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.remove(patterns, SubscriptionKind::PSubscribe);
	}

	fn add<I, S>(&self, keys: I, kind: SubscriptionKind)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for key in keys {
			if let Some(record) = self.shared.subscriptions.insert(key.into(), kind) {
				info!(
					channel = %record.channel,
					kind = kind.command_name(),
					total = self.shared.subscriptions.len(),
					"Subscribing"
				);
				self.send(record.subscribe_command());
			}
		}
	}

	fn remove<I, S>(&self, keys: I, kind: SubscriptionKind)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for key in keys {
			if let Some(record) = self.shared.subscriptions.remove(key.as_ref(), kind) {
				info!(
					channel = %record.channel,
					kind = kind.unsubscribe_command_name(),
					total = self.shared.subscriptions.len(),
					"Unsubscribing"
				);
				self.send(record.unsubscribe_command());
			}
		}
	}

	/// Queue raw command bytes. A full queue drops the command with a
	/// warning.
	pub fn send(&self, cmd: Bytes) {
		self.shared.send(cmd);
	}

	/// Queue raw command bytes, reporting a full queue instead of logging it.
	pub fn try_send(&self, cmd: Bytes) -> Result<(), BusError> {
		self.shared.try_send(cmd)
	}

	/// Stop all tasks and close the socket. Queued commands are discarded.
	pub fn close(&self) {
		self.shared.close();
	}

	pub fn state(&self) -> ConnectionState {
		*self.shared.state.borrow()
	}

	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.shared.state.subscribe()
	}

	/// Current subscription records, in no particular order.
	pub fn subscriptions(&self) -> Vec<ReconnectingChannel> {
		self.shared.subscriptions.snapshot()
	}

	/// The commands written first on every new connection: a `PING`
	/// followed by one (P)SUBSCRIBE per remembered subscription.
	pub fn handshake(&self) -> Vec<Bytes> {
		self.shared.handshake()
	}
}

impl Shared {
	fn link(&self) -> MutexGuard<'_, Link> {
		self.link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn is_closed(&self) -> bool {
		*self.shutdown.borrow()
	}

	fn is_connected(&self) -> bool {
		*self.state.borrow() == ConnectionState::Connected
	}

	/// `Closed` is never left once entered.
	fn set_state(&self, next: ConnectionState) {
		self.state.send_if_modified(|state| {
			if *state == ConnectionState::Closed || *state == next {
				return false;
			}
			*state = next;
			true
		});
	}

	fn try_send(&self, cmd: Bytes) -> Result<(), BusError> {
		if self.is_closed() {
			return Err(BusError::Closed);
		}
		let len = cmd.len();
		self.commands.try_send(cmd).map_err(|e| match e {
			mpsc::error::TrySendError::Full(_) => BusError::QueueFull,
			mpsc::error::TrySendError::Closed(_) => BusError::Closed,
		})?;
		trace!(bytes = len, "Queued command");
		Ok(())
	}

	fn send(&self, cmd: Bytes) {
		match self.try_send(cmd) {
			Ok(()) => {}
			Err(BusError::QueueFull) => {
				warn!(
					capacity = self.commands.max_capacity(),
					"Command queue full, dropping command"
				);
			}
			Err(BusError::Closed) => debug!("Connection closed, dropping command"),
		}
	}

	fn handshake(&self) -> Vec<Bytes> {
		std::iter::once(resp::format_command(["PING"]))
			.chain(
				self.subscriptions
					.snapshot()
					.iter()
					.map(ReconnectingChannel::subscribe_command),
			)
			.collect()
	}

	fn touch(&self) {
		self.link().last_data = Instant::now();
	}

	/// Force the given epoch down. Stale requests for an older epoch are
	/// ignored so they cannot kill a newer connection.
	fn disconnect(&self, epoch: u64) {
		let mut link = self.link();
		if link.epoch != epoch {
			return;
		}
		if let Some(kill) = link.kill.take() {
			kill.send_replace(true);
			self.set_state(ConnectionState::Disconnected);
		}
	}

	fn close(&self) {
		if self.shutdown.send_replace(true) {
			return;
		}
		self.state.send_replace(ConnectionState::Closed);
		let epoch = self.link().epoch;
		self.disconnect(epoch);
		info!("Connection manager closed");
	}

	async fn connect(&self) -> io::Result<EpochReader> {
		self.set_state(ConnectionState::Connecting);
		let addr = self.config.addr.as_str();

		let stream = tokio::time::timeout(self.config.dial_timeout(), TcpStream::connect(addr))
			.await
			.map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "dial timed out"))??;
		stream.set_nodelay(true)?;
		let (reader, mut writer) = stream.into_split();

		// Written before the writer is published, so it always precedes
		// whatever is still queued from before.
		let mut hello = BytesMut::new();
		for cmd in self.handshake() {
			hello.extend_from_slice(&cmd);
		}
		writer.write_all(&hello).await?;

		let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
		let (kill, killed) = watch::channel(false);
		*self.writer.lock().await = Some(EpochWriter {
			epoch,
			writer,
			killed: killed.clone(),
		});
		{
			let mut link = self.link();
			link.epoch = epoch;
			link.kill = Some(kill);
			link.last_data = Instant::now();
		}
		self.set_state(ConnectionState::Connected);

		// close() may have raced with the dial.
		if self.is_closed() {
			self.disconnect(epoch);
		}

		info!(addr, epoch, "Connected");
		Ok(EpochReader {
			epoch,
			reader,
			killed,
		})
	}

	/// Called by the receive loop when an epoch's socket is done.
	async fn end_epoch(&self, epoch: u64) {
		{
			let mut writer = self.writer.lock().await;
			if writer.as_ref().is_some_and(|w| w.epoch == epoch) {
				*writer = None;
			}
		}
		let mut link = self.link();
		// A newer epoch may already be up if this one was killed early.
		if link.epoch == epoch {
			link.kill = None;
			self.set_state(ConnectionState::Disconnected);
		}
		info!(epoch, "Disconnected");
	}

	async fn write(&self, cmd: &[u8]) -> WriteOutcome {
		let mut guard = self.writer.lock().await;
		let Some(conn) = guard.as_mut() else {
			return WriteOutcome::NotConnected;
		};
		let epoch = conn.epoch;
		// Killed but not yet torn down; keep the command for the next epoch.
		if *conn.killed.borrow() {
			return WriteOutcome::NotConnected;
		}
		let mut killed = conn.killed.clone();

		let result = tokio::select! {
			result = conn.writer.write_all(cmd) => result,
			_ = cancelled(&mut killed) => {
				Err(io::Error::new(io::ErrorKind::ConnectionAborted, "connection closed"))
			}
		};
		drop(guard);

		match result {
			Ok(()) => WriteOutcome::Written,
			Err(e) => {
				error!(epoch, error = %e, "Failed to send command");
				self.disconnect(epoch);
				WriteOutcome::Failed
			}
		}
	}

	fn check_health(&self) {
		let (epoch, idle) = {
			let link = self.link();
			if link.kill.is_none() || !self.is_connected() {
				return;
			}
			(link.epoch, link.last_data.elapsed())
		};

		let interval = self.config.health_check_interval();
		if idle > self.config.dead_after() {
			warn!(
				epoch,
				idle_ms = idle.as_millis() as u64,
				"No data received for a while, disconnecting"
			);
			self.disconnect(epoch);
		} else if idle >= interval {
			let nonce = Ulid::new().to_string();
			debug!(epoch, %nonce, "Connection idle, sending ping");
			self.send(resp::format_command(["PING", nonce.as_str()]));
		}
	}

	fn dispatch(&self, value: RespValue, messages: &mpsc::Sender<BusMessage>) {
		if let Some(msg) = parse_message(&value) {
			trace!(
				channel = %msg.channel,
				pattern = %msg.pattern,
				bytes = msg.data.len(),
				"Message"
			);
			offer(messages, msg, "messages");
		} else if is_pong(&value) {
			trace!("Pong");
		} else {
			debug!(kind = %value.kind(), %value, "Ignoring reply");
		}
	}
}

/// Resolves once the flag flips to `true` or its sender is gone.
async fn cancelled(flag: &mut watch::Receiver<bool>) {
	let _ = flag.wait_for(|set| *set).await;
}

fn can_send(state: &ConnectionState) -> bool {
	matches!(state, ConnectionState::Connected | ConnectionState::Closed)
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
	current.saturating_mul(2).min(max)
}

async fn supervise(shared: Arc<Shared>, epochs: mpsc::Sender<EpochReader>) {
	let mut shutdown = shared.shutdown.subscribe();
	let mut delay = shared.config.min_backoff();

	loop {
		if shared.is_closed() {
			break;
		}

		if !shared.is_connected() {
			match shared.connect().await {
				Ok(reader) => {
					delay = shared.config.min_backoff();
					if epochs.send(reader).await.is_err() {
						break;
					}
				}
				Err(e) => {
					shared.set_state(ConnectionState::Disconnected);
					error!(
						addr = %shared.config.addr,
						error = %e,
						retry_in_ms = delay.as_millis() as u64,
						"Failed to connect"
					);
					tokio::select! {
						_ = tokio::time::sleep(delay) => {}
						_ = cancelled(&mut shutdown) => break,
					}
					delay = next_backoff(delay, shared.config.max_backoff());
				}
			}
		}

		tokio::select! {
			_ = tokio::time::sleep(shared.config.reconnect_poll()) => {}
			_ = cancelled(&mut shutdown) => break,
		}
	}
	debug!("Reconnect supervisor stopped");
}

async fn health_check(shared: Arc<Shared>) {
	let mut shutdown = shared.shutdown.subscribe();
	let interval = shared.config.health_check_interval();
	let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = ticker.tick() => shared.check_health(),
			_ = cancelled(&mut shutdown) => break,
		}
	}
	debug!("Health check stopped");
}

async fn send_loop(shared: Arc<Shared>, mut commands: mpsc::Receiver<Bytes>) {
	let mut shutdown = shared.shutdown.subscribe();
	let mut state = shared.state.subscribe();
	// A command popped while the socket was going away; retried first.
	let mut pending: Option<Bytes> = None;

	loop {
		let ready = tokio::select! {
			ready = state.wait_for(can_send) => {
				ready.map(|s| *s)
			}
			_ = cancelled(&mut shutdown) => break,
		};
		match ready {
			Ok(ConnectionState::Connected) => {}
			_ => break,
		}

		let cmd = match pending.take() {
			Some(cmd) => cmd,
			None => tokio::select! {
				cmd = commands.recv() => match cmd {
					Some(cmd) => cmd,
					None => break,
				},
				_ = cancelled(&mut shutdown) => break,
			},
		};

		match shared.write(&cmd).await {
			WriteOutcome::Written => trace!(bytes = cmd.len(), "Sent command"),
			WriteOutcome::NotConnected => {
				pending = Some(cmd);
				// Wait for the state to move on before retrying.
				let _ = state.wait_for(|s| *s != ConnectionState::Connected).await;
			}
			WriteOutcome::Failed => {}
		}
	}
	debug!("Send loop stopped");
}

async fn receive_loop(
	shared: Arc<Shared>,
	mut epochs: mpsc::Receiver<EpochReader>,
	data: mpsc::Sender<Chunk>,
) {
	let mut buffer = vec![0u8; shared.config.read_buffer_size.max(1)];

	while let Some(EpochReader {
		epoch,
		mut reader,
		mut killed,
	}) = epochs.recv().await
	{
		loop {
			tokio::select! {
				read = reader.read(&mut buffer) => match read {
					Ok(0) => {
						info!(epoch, "Connection closed by peer");
						break;
					}
					Ok(n) => {
						shared.touch();
						trace!(epoch, bytes = n, "Received");
						let chunk = Chunk {
							epoch,
							data: Bytes::copy_from_slice(&buffer[..n]),
						};
						// A gap in the byte stream cannot be decoded.
						if !offer(&data, chunk, "data") {
							warn!(epoch, "Data queue full, aborting connection");
							break;
						}
					}
					Err(e) => {
						error!(epoch, error = %e, "Read failed");
						break;
					}
				},
				_ = cancelled(&mut killed) => break,
			}
		}

		shared.end_epoch(epoch).await;
	}
	debug!("Receive loop stopped");
}

async fn dispatch_loop(
	shared: Arc<Shared>,
	mut data: mpsc::Receiver<Chunk>,
	messages: mpsc::Sender<BusMessage>,
) {
	let mut shutdown = shared.shutdown.subscribe();
	let mut parser = RespParser::new();
	let mut current = 0;
	let mut corrupt = false;

	loop {
		let chunk = tokio::select! {
			chunk = data.recv() => match chunk {
				Some(chunk) => chunk,
				None => break,
			},
			_ = cancelled(&mut shutdown) => break,
		};

		if chunk.epoch != current {
			parser.reset();
			current = chunk.epoch;
			corrupt = false;
		}
		if corrupt {
			continue;
		}

		parser.provide(&chunk.data);
		loop {
			match parser.parse() {
				RespParseResult::Complete(value) => shared.dispatch(value, &messages),
				RespParseResult::Incomplete => break,
				RespParseResult::Error(e) => {
					error!(epoch = current, error = %e, "Error parsing data, disconnecting");
					parser.reset();
					corrupt = true;
					shared.disconnect(current);
					break;
				}
			}
		}
	}
	debug!("Dispatch loop stopped");
}
