use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{ApplicationConfig, ConfigError};

/// Default filter directive for a configuration, scoped to this crate
pub fn filter_directive(config: &ApplicationConfig) -> String {
    format!("dactyl_core={}", config.log_level)
}

/// Install a global tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over the configured level. Production uses
/// JSON output, other environments plain text. Returns `Ok(false)` when a
/// global subscriber was already installed, which is common in tests.
pub fn init_tracing(config: &ApplicationConfig) -> Result<bool, ConfigError> {
    let directive = filter_directive(config);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|_| {
            ConfigError::invalid_value("log_level", directive.clone(), "a valid tracing filter")
        })?;

    let installed = if config.environment.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new())
            .try_init()
    };

    Ok(installed.is_ok())
}
