use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TelemetryError;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Custom time formatter that displays time as "YYYY-MM-DD HH:MM:SS.micros"
struct CustomTimeFormat;

impl FormatTime for CustomTimeFormat {
	fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
		let now = std::time::SystemTime::now();
		let datetime: chrono::DateTime<chrono::Local> = now.into();
		write!(w, "{}", datetime.format("[%Y-%m-%d %H:%M:%S%.6f]"))
	}
}

type ReloadHandle = reload::Handle<EnvFilter, Registry>;

static RELOAD_HANDLE: OnceLock<ReloadHandle> = OnceLock::new();

/// Initialize the logger with the provided log level
///
/// This sets up a console logger with:
/// - The log level from the `level` parameter, unless `RUST_LOG` is set, in
///   which case its directives win (e.g. `RUST_LOG=bus=trace,info`)
/// - Timestamps in format: YYYY-MM-DD HH:MM:SS.micros
/// - Target/module information
///
/// Only the first call installs the subscriber; later calls do nothing.
///
/// # Example
///
/// ```no_run
/// telemetry::logger::init("info");
/// tracing::info!("Watcher starting");
/// ```
pub fn init(level: &str) {
	let env_filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	let (filter_layer, reload_handle) = reload::Layer::new(env_filter);

	let installed = tracing_subscriber::registry()
		.with(filter_layer)
		.with(
			fmt::layer()
				.with_timer(CustomTimeFormat)
				.with_target(true)
				.with_thread_ids(true)
				.with_line_number(false)
				.with_file(false),
		)
		.try_init();

	if installed.is_ok() {
		let _ = RELOAD_HANDLE.set(reload_handle);
	}
}

/// Check a level name, returning it lowercased.
pub fn validate_log_level(level: &str) -> Result<String, TelemetryError> {
	let level_lower = level.to_lowercase();
	if VALID_LEVELS.contains(&level_lower.as_str()) {
		Ok(level_lower)
	} else {
		Err(TelemetryError::InvalidLogLevel(level.to_string()))
	}
}

/// Reload the log level dynamically
///
/// # Arguments
///
/// * `level` - The new log level to set. Valid values: trace, debug, info,
///   warn, error
///
/// # Example
///
/// ```no_run
/// # use telemetry::logger::reload_log_level;
/// reload_log_level("debug")?;
/// # Ok::<(), telemetry::TelemetryError>(())
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - The logger has not been initialized
/// - The provided log level is invalid
/// - The reload operation fails
pub fn reload_log_level(level: &str) -> Result<(), TelemetryError> {
	let level_lower = validate_log_level(level)?;

	let handle = RELOAD_HANDLE.get().ok_or(TelemetryError::NotInitialized)?;

	handle
		.reload(EnvFilter::new(&level_lower))
		.map_err(|e| TelemetryError::ReloadFailed(e.to_string()))
}
