//! # Bus - a self-healing RESP pub/sub client
//!
//! [`Reconnecting`] keeps one long-lived subscription session against a
//! single Redis-protocol endpoint. It owns the socket, reconnects with
//! exponential backoff, replays every subscription after a reconnect and
//! pings the server when the line goes quiet. Published messages come out of
//! the [`Messages`] receiver returned alongside it.
//!
//! Delivery is fire-and-forget: every internal queue is bounded, and when
//! one is full the newest item is dropped and logged.
//!
//! ## Example
//!
//! ```no_run
//! use bus::ConnectionConfig;
//! use bus::Reconnecting;
//!
//! # async fn run() {
//! let (conn, mut messages) = Reconnecting::new(ConnectionConfig::new("127.0.0.1:6379"));
//! conn.subscribe(["orders"]);
//! conn.psubscribe(["audit.*"]);
//!
//! while let Some(msg) = messages.recv().await {
//!     println!("{} ({}): {} bytes", msg.channel, msg.pattern, msg.data.len());
//! }
//! # }
//! ```

mod config;
mod error;
mod message;
mod publish;
mod queue;
mod reconnecting;
mod subscription;

pub use config::ConnectionConfig;
pub use error::BusError;
pub use error::PublishError;
pub use message::BusMessage;
pub use message::MessageKind;
pub use message::is_pong;
pub use message::parse_message;
pub use publish::Publisher;
pub use reconnecting::ConnectionState;
pub use reconnecting::Messages;
pub use reconnecting::Reconnecting;
pub use subscription::ReconnectingChannel;
pub use subscription::SubscriptionKind;
