mod error;
pub mod logger;

pub use error::TelemetryError;
// Re-export logger initialization for convenience
pub use logger::init;
pub use logger::reload_log_level;
