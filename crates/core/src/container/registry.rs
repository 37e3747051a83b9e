use std::collections::HashMap;
use std::sync::Arc;

use crate::container::descriptor::{ServiceDescriptor, ServiceKey};
use crate::container::scope::ServiceScope;

/// Registry mapping keys to service definitions
///
/// Pure bookkeeping: a definition's dependencies are not validated until the
/// service is resolved.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    descriptors: HashMap<ServiceKey, Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    /// Create a new service registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, replacing any previous definition for its key.
    /// Returns the replaced definition.
    pub fn register(&mut self, descriptor: ServiceDescriptor) -> Option<Arc<ServiceDescriptor>> {
        self.descriptors
            .insert(descriptor.key.clone(), Arc::new(descriptor))
    }

    /// Look up the definition for a key
    pub fn lookup(&self, key: &ServiceKey) -> Option<&Arc<ServiceDescriptor>> {
        self.descriptors.get(key)
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.descriptors.contains_key(key)
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.descriptors.len()
    }

    /// All registered keys, sorted for deterministic iteration
    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.descriptors.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Registered keys with the given scope, sorted
    pub fn keys_with_scope(&self, scope: ServiceScope) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self
            .descriptors
            .values()
            .filter(|descriptor| descriptor.scope == scope)
            .map(|descriptor| descriptor.key.clone())
            .collect();
        keys.sort();
        keys
    }
}
