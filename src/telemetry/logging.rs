use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::error::Error;
use crate::types::Result;

/// Initialize the logging system
pub fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(parse_level(&settings.general.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    // Whether to use JSON format
    let result = if settings.telemetry.structured_logging {
        registry.with(fmt::layer().with_target(true).json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::Internal(format!("Failed to set global default subscriber: {}", e)))
}

/// Parse a configured log level, falling back to `INFO`
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
