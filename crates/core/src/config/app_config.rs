use crate::config::{ConfigError, ConfigSource};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

pub const ENV_ENVIRONMENT: &str = "DACTYL_ENV";
pub const ENV_LOG_LEVEL: &str = "DACTYL_LOG";
pub const ENV_VALIDATE_ON_BOOT: &str = "DACTYL_VALIDATE_ON_BOOT";
pub const ENV_EXPOSE_ERRORS: &str = "DACTYL_EXPOSE_ERRORS";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration trait for application configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "test")]
    Testing,
    #[serde(alias = "prod")]
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::invalid_value(
                "environment",
                s,
                "development, testing, or production",
            )),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    /// Check if environment is development
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Check if environment is testing
    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    /// Check if environment is production
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get debug mode status based on environment
    pub fn debug_mode(&self) -> bool {
        !self.is_production()
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationConfig {
    pub environment: Environment,
    pub log_level: String,
    /// Check every registered graph before instantiating singletons
    pub validate_on_boot: bool,
    /// Include error messages in 500 response bodies
    pub expose_error_details: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApplicationConfigFile {
    environment: Option<Environment>,
    log_level: Option<String>,
    validate_on_boot: Option<bool>,
    expose_error_details: Option<bool>,
}

impl ApplicationConfig {
    /// Defaults for an environment
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            log_level: match environment {
                Environment::Development => "debug",
                Environment::Testing => "warn",
                Environment::Production => "info",
            }
            .to_string(),
            validate_on_boot: environment.debug_mode(),
            expose_error_details: environment.debug_mode(),
        }
    }

    /// Create configuration for development
    pub fn development() -> Self {
        Self::for_environment(Environment::Development)
    }

    /// Create configuration for testing
    pub fn testing() -> Self {
        Self::for_environment(Environment::Testing)
    }

    /// Create configuration for production
    pub fn production() -> Self {
        Self::for_environment(Environment::Production)
    }

    /// Parse configuration from YAML; omitted fields take the environment's
    /// defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: ApplicationConfigFile = serde_yaml::from_str(yaml)?;

        let mut config =
            Self::for_environment(file.environment.unwrap_or(Environment::Development));
        if let Some(log_level) = file.log_level {
            config.log_level = log_level.to_lowercase();
        }
        if let Some(validate_on_boot) = file.validate_on_boot {
            config.validate_on_boot = validate_on_boot;
        }
        if let Some(expose_error_details) = file.expose_error_details {
            config.expose_error_details = expose_error_details;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(field, value, "true or false")),
    }
}

fn source_for(var: &str, default: impl Into<String>) -> ConfigSource {
    if env::var(var).is_ok() {
        ConfigSource::EnvVar(var.to_string())
    } else {
        ConfigSource::Default(default.into())
    }
}

impl AppConfigTrait for ApplicationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var(ENV_ENVIRONMENT) {
            Ok(env_str) => env_str.parse()?,
            Err(_) => Environment::Development,
        };

        let mut config = Self::for_environment(environment);

        if let Ok(log_level) = env::var(ENV_LOG_LEVEL) {
            config.log_level = log_level.to_lowercase();
        }

        if let Ok(value) = env::var(ENV_VALIDATE_ON_BOOT) {
            config.validate_on_boot = parse_bool("validate_on_boot", &value)?;
        }

        if let Ok(value) = env::var(ENV_EXPOSE_ERRORS) {
            config.expose_error_details = parse_bool("expose_error_details", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                self.log_level.clone(),
                format!("one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();

        sources.insert(
            "environment".to_string(),
            source_for(ENV_ENVIRONMENT, "development"),
        );
        sources.insert(
            "log_level".to_string(),
            source_for(ENV_LOG_LEVEL, "based on environment"),
        );
        sources.insert(
            "validate_on_boot".to_string(),
            source_for(ENV_VALIDATE_ON_BOOT, "based on environment"),
        );
        sources.insert(
            "expose_error_details".to_string(),
            source_for(ENV_EXPOSE_ERRORS, "based on environment"),
        );

        sources
    }
}
