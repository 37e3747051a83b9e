use std::collections::HashMap;

use crate::container::descriptor::{ServiceInstance, ServiceKey};

/// Service scope enumeration, ordered by increasing breadth of sharing
///
/// `Transient < Request < Singleton`. A service may only depend on services
/// whose scope is at least as wide as its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceScope {
    /// New instance for every resolution
    Transient,
    /// One instance per request lifetime
    Request,
    /// Single instance shared across the application
    Singleton,
}

impl ServiceScope {
    /// Check if the scope is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, ServiceScope::Singleton)
    }

    /// Check if the scope is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceScope::Transient)
    }

    /// Check if the scope is request
    pub fn is_request(&self) -> bool {
        matches!(self, ServiceScope::Request)
    }

    /// Whether a service of this scope may depend on a service of `child` scope
    pub fn can_depend_on(&self, child: ServiceScope) -> bool {
        child >= *self
    }

    /// Get the scope name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceScope::Transient => "transient",
            ServiceScope::Request => "request",
            ServiceScope::Singleton => "singleton",
        }
    }
}

impl Default for ServiceScope {
    fn default() -> Self {
        ServiceScope::Transient
    }
}

impl std::fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceScope {
    type Err = crate::config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transient" => Ok(ServiceScope::Transient),
            "request" | "scoped" => Ok(ServiceScope::Request),
            "singleton" => Ok(ServiceScope::Singleton),
            _ => Err(crate::config::ConfigError::invalid_value(
                "scope",
                s,
                "transient, request, or singleton",
            )),
        }
    }
}

/// Identifier of a single request lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    /// Generate a fresh, unique request id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request scoped instance cache owned by one request lifetime
#[derive(Debug)]
pub struct ScopedServiceManager {
    request_id: RequestId,
    services: HashMap<ServiceKey, ServiceInstance>,
}

impl ScopedServiceManager {
    /// Create a new, empty cache under a generated request id
    pub fn new() -> Self {
        Self::with_id(RequestId::new())
    }

    pub fn with_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            services: HashMap::new(),
        }
    }

    /// Get the request id this cache belongs to
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Cache an instance, keeping an existing one if present
    pub fn insert_if_absent(&mut self, key: ServiceKey, instance: ServiceInstance) -> ServiceInstance {
        self.services.entry(key).or_insert(instance).clone()
    }

    /// Get a cached instance
    pub fn get(&self, key: &ServiceKey) -> Option<ServiceInstance> {
        self.services.get(key).cloned()
    }

    /// Check if an instance is cached for the key
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.services.contains_key(key)
    }

    /// Drop every cached instance
    pub fn clear(&mut self) {
        self.services.clear();
    }

    /// Get the number of cached instances
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

impl Default for ScopedServiceManager {
    fn default() -> Self {
        Self::new()
    }
}
