//! Command-line and file configuration for buswatch.

use std::path::Path;

use bus::ConnectionConfig;
pub use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use telemetry::TelemetryError;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "conf/buswatch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("Failed to read configuration file '{path}': {source}")]
	Io {
		source: std::io::Error,
		path: String,
	},

	#[error("Failed to parse TOML configuration: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("Failed to parse JSON configuration: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("Failed to parse YAML configuration: {0}")]
	YamlParse(#[from] serde_yaml::Error),

	#[error("Unsupported configuration format: {0}")]
	UnsupportedFormat(String),

	#[error("Configuration file has no extension")]
	NoExtension,

	#[error(transparent)]
	LogLevel(#[from] TelemetryError),
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Configuration file path (TOML, JSON, or YAML).
	/// Defaults to conf/buswatch.toml if it exists.
	#[arg(short, long)]
	pub config: Option<String>,

	/// Bus address (host:port)
	#[arg(short, long)]
	pub addr: Option<String>,

	/// Comma separated channels; entries containing '*' are patterns
	#[arg(long, value_delimiter = ',')]
	pub channels: Option<Vec<String>>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
	pub log_level: String,
	pub channels: Vec<String>,
	pub connection: ConnectionConfig,
}

impl Default for WatchConfig {
	fn default() -> Self {
		Self {
			log_level: "info".into(),
			channels: vec!["*".into()],
			connection: ConnectionConfig::default(),
		}
	}
}

impl WatchConfig {
	/// Split `channels` into exact names and glob patterns.
	pub fn subscriptions(&self) -> (Vec<String>, Vec<String>) {
		self.channels
			.iter()
			.map(|c| c.trim())
			.filter(|c| !c.is_empty())
			.map(str::to_string)
			.partition(|c| !c.contains('*'))
	}
}

/// Resolve the effective configuration and start logging.
pub fn setup(args: Cli) -> Result<WatchConfig, ConfigError> {
	let config = resolve(args)?;
	telemetry::logger::init(&config.log_level);
	Ok(config)
}

fn resolve(args: Cli) -> Result<WatchConfig, ConfigError> {
	let mut config = match args.config.as_deref() {
		Some(p) => load_from_file(p)?,
		None if Path::new(DEFAULT_CONFIG).exists() => load_from_file(DEFAULT_CONFIG)?,
		None => WatchConfig::default(),
	};
	apply_overrides(&mut config, args);

	// Only plain level names; an arbitrary word is a valid target directive.
	config.log_level = telemetry::logger::validate_log_level(&config.log_level)?;
	Ok(config)
}

fn apply_overrides(config: &mut WatchConfig, args: Cli) {
	if let Some(addr) = args.addr {
		config.connection.addr = addr;
	}
	if let Some(channels) = args.channels {
		config.channels = channels;
	}
	if let Some(log_level) = args.log_level {
		config.log_level = log_level;
	}
}

fn load_from_file<P: AsRef<Path>>(path: P) -> Result<WatchConfig, ConfigError> {
	let path_ref = path.as_ref();
	let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
		path: path_ref.display().to_string(),
		source,
	})?;

	let extension = path_ref
		.extension()
		.and_then(|ext| ext.to_str())
		.ok_or(ConfigError::NoExtension)?;

	match extension.to_lowercase().as_str() {
		"toml" => Ok(toml::from_str(&content)?),
		"json" => Ok(serde_json::from_str(&content)?),
		"yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
		_ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn write_config(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join(name);
		std::fs::write(&file_path, content).unwrap();
		(dir, file_path)
	}

	#[test]
	fn test_parse_toml() {
		let (_dir, path) = write_config(
			"buswatch.toml",
			r#"
log_level = "debug"
channels = ["orders", "audit.*"]

[connection]
addr = "10.0.0.7:6379"
health_check_interval_ms = 2000
"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.channels, vec!["orders", "audit.*"]);
		assert_eq!(config.connection.addr, "10.0.0.7:6379");
		assert_eq!(config.connection.health_check_interval_ms, 2000);
		assert_eq!(config.connection.max_backoff_ms, 30_000);
	}

	#[test]
	fn test_parse_json() {
		let (_dir, path) = write_config(
			"buswatch.json",
			r#"{"channels": ["a"], "connection": {"addr": "localhost:7000"}}"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.log_level, "info");
		assert_eq!(config.channels, vec!["a"]);
		assert_eq!(config.connection.addr, "localhost:7000");
	}

	#[test]
	fn test_parse_yaml() {
		let (_dir, path) = write_config(
			"buswatch.yml",
			r#"
log_level: warn
connection:
  addr: "bus:6380"
  min_backoff_ms: 250
"#,
		);

		let config = load_from_file(&path).unwrap();
		assert_eq!(config.log_level, "warn");
		assert_eq!(config.channels, vec!["*"]);
		assert_eq!(config.connection.addr, "bus:6380");
		assert_eq!(config.connection.min_backoff_ms, 250);
	}

	#[rstest]
	#[case("buswatch.ini", "UnsupportedFormat")]
	#[case("buswatch", "NoExtension")]
	fn test_rejected_files(#[case] name: &str, #[case] expected: &str) {
		let (_dir, path) = write_config(name, "log_level = \"info\"");
		let err = load_from_file(&path).unwrap_err();
		assert!(format!("{err:?}").starts_with(expected), "{err:?}");
	}

	#[test]
	fn test_missing_file() {
		let err = load_from_file("/nonexistent/buswatch.toml").unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn test_cli_overrides_file() {
		let args = Cli::parse_from([
			"buswatch",
			"--addr",
			"127.0.0.1:6379",
			"--channels",
			"orders,audit.*",
			"-l",
			"trace",
		]);
		let mut config = WatchConfig::default();
		apply_overrides(&mut config, args);

		assert_eq!(config.connection.addr, "127.0.0.1:6379");
		assert_eq!(config.channels, vec!["orders", "audit.*"]);
		assert_eq!(config.log_level, "trace");
	}

	#[test]
	fn test_unknown_log_level_rejected() {
		let (_dir, path) = write_config("buswatch.toml", "log_level = \"info\"");
		let args = Cli::parse_from([
			"buswatch",
			"-c",
			path.to_str().unwrap(),
			"--log-level",
			"verbose",
		]);

		let err = resolve(args).unwrap_err();
		match err {
			ConfigError::LogLevel(TelemetryError::InvalidLogLevel(level)) => {
				assert_eq!(level, "verbose");
			}
			other => panic!("Expected InvalidLogLevel, got {other:?}"),
		}
	}

	#[test]
	fn test_log_level_from_file_validated() {
		let (_dir, path) = write_config("buswatch.yaml", "log_level: loud\n");
		let args = Cli::parse_from(["buswatch", "-c", path.to_str().unwrap()]);
		assert!(matches!(resolve(args), Err(ConfigError::LogLevel(_))));
	}

	#[test]
	fn test_log_level_normalized() {
		let (_dir, path) = write_config("buswatch.toml", "log_level = \"DEBUG\"");
		let args = Cli::parse_from(["buswatch", "-c", path.to_str().unwrap()]);
		assert_eq!(resolve(args).unwrap().log_level, "debug");
	}

	#[test]
	fn test_no_flags_keep_config() {
		let args = Cli::parse_from(["buswatch"]);
		let mut config = WatchConfig::default();
		apply_overrides(&mut config, args);
		assert_eq!(config, WatchConfig::default());
	}

	#[test]
	fn test_subscriptions_split_patterns() {
		let config = WatchConfig {
			channels: vec![
				"orders".into(),
				"audit.*".into(),
				" ".into(),
				"*".into(),
				" users ".into(),
			],
			..WatchConfig::default()
		};
		let (channels, patterns) = config.subscriptions();
		assert_eq!(channels, vec!["orders", "users"]);
		assert_eq!(patterns, vec!["audit.*", "*"]);
	}
}
