mod banner;
mod config;

use bus::BusMessage;
use bus::Reconnecting;
use config::Cli;
use config::Parser;
use tracing::info;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	let config = config::setup(args)?;

	banner::show_banner(&config.connection.addr);
	info!(version = %banner::version(), "buswatch starting");

	let (channels, patterns) = config.subscriptions();
	let (conn, mut messages) = Reconnecting::new(config.connection.clone());
	if !channels.is_empty() {
		info!(?channels, "Subscribing");
		conn.subscribe(channels);
	}
	if !patterns.is_empty() {
		info!(?patterns, "Pattern subscribing");
		conn.psubscribe(patterns);
	}

	let shutdown = shutdown_signal();
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			msg = messages.recv() => match msg {
				Some(msg) => print_message(&msg),
				None => break,
			},
			_ = &mut shutdown => {
				info!("Shutdown signal received");
				break;
			}
		}
	}

	conn.close();
	info!("buswatch stopped");
	Ok(())
}

fn print_message(msg: &BusMessage) {
	match msg.into_map() {
		Ok(fields) => {
			info!(channel = %msg.channel, pattern = %msg.pattern, ?fields, "Message");
		}
		Err(e) => {
			warn!(
				channel = %msg.channel,
				pattern = %msg.pattern,
				payload = %String::from_utf8_lossy(&msg.data),
				error = %e,
				"Payload is not a JSON object"
			);
		}
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!(error = %e, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				warn!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
