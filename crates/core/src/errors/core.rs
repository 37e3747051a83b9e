use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::scope::ServiceScope;

/// Core error type for the dactyl framework
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(
        "Parent dependency '{parent}' ({parent_scope}) depends on children with a narrower scope ({children}). \
         Scope can only widen down the tree (transient -> request -> singleton)"
    )]
    ScopeViolation {
        parent: String,
        parent_scope: ServiceScope,
        children: String,
    },

    #[error(
        "Attempted to resolve request scoped dependency '{service}' outside of a request lifetime. \
         Request scoped dependencies may only be resolved through Container::new_request_lifetime()"
    )]
    MissingRequestContext { service: String },

    #[error("Circular dependency detected: {path} (cycle at: {cycle_service})")]
    CircularDependency { path: String, cycle_service: String },

    #[error("Dependency '{dependency}' required by '{requested_by}' is not registered")]
    UnresolvedDependency {
        dependency: String,
        requested_by: String,
    },

    #[error("Service '{service}' could not be cast to '{expected}'")]
    TypeMismatch { service: String, expected: String },

    #[error("Cannot register '{service}': registrations are closed once singletons are instantiated")]
    RegistrationClosed { service: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("Service initialization failed for '{service_type}': {source}")]
    ServiceInitializationFailed {
        service_type: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CoreError {
    /// Wrap a foreign error raised while a factory constructs a service
    pub fn initialization(
        service_type: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ServiceInitializationFailed {
            service_type: service_type.into(),
            source: source.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn lock(resource: &str) -> Self {
        Self::LockError {
            resource: resource.to_string(),
        }
    }

    /// Check if the error is a scope violation
    pub fn is_scope_violation(&self) -> bool {
        matches!(self, Self::ScopeViolation { .. })
    }

    /// Check if the error is a circular dependency
    pub fn is_circular_dependency(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error comes from a missing request lifetime
    pub fn is_missing_request_context(&self) -> bool {
        matches!(self, Self::MissingRequestContext { .. })
    }

    /// Check if the error is an unregistered dependency inside a graph
    pub fn is_unresolved_dependency(&self) -> bool {
        matches!(self, Self::UnresolvedDependency { .. })
    }

    /// Stable machine readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ScopeViolation { .. } => "SCOPE_VIOLATION",
            Self::MissingRequestContext { .. } => "MISSING_REQUEST_CONTEXT",
            Self::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            Self::UnresolvedDependency { .. } => "UNRESOLVED_DEPENDENCY",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::RegistrationClosed { .. } => "REGISTRATION_CLOSED",
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::LockError { .. } | Self::ServiceInitializationFailed { .. } => "INTERNAL_ERROR",
        }
    }
}

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// API error structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Add a hint to the API error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        let api = Self::new(error.code(), error.to_string());
        match error {
            CoreError::ScopeViolation { .. } => {
                api.with_hint("Widen the child's scope or narrow the parent's scope")
            }
            CoreError::MissingRequestContext { .. } => {
                api.with_hint("Resolve through a RequestLifetime")
            }
            CoreError::UnresolvedDependency { dependency, .. } => {
                api.with_hint(format!("Register '{}' before resolving", dependency))
            }
            _ => api,
        }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        Self { error }
    }
}
