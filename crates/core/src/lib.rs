pub mod bootstrap;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod errors;

// Re-export key types for convenience
pub use bootstrap::{Application, ApplicationBuilder};
pub use config::{
    init_tracing, AppConfigTrait, ApplicationConfig, ConfigError, ConfigSource, Environment,
};
pub use container::{
    Container, DependencyResolver, Injectable, RequestId, RequestLifetime, ResolvedDependencies,
    ServiceDescriptor, ServiceInstance, ServiceKey, ServiceRegistry, ServiceScope, ServiceToken,
};
pub use dispatch::{ExecutionContainer, ExecutionResult, HttpException};
pub use errors::{ApiError, ApiErrorResponse, CoreError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework information
pub const FRAMEWORK_NAME: &str = "dactyl";

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}

/// Get framework name
pub fn name() -> &'static str {
    FRAMEWORK_NAME
}
