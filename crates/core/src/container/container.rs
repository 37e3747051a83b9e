use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::container::autowiring::Injectable;
use crate::container::descriptor::{
    downcast, ResolvedDependencies, ServiceDescriptor, ServiceInstance, ServiceKey,
};
use crate::container::lifetime::RequestLifetime;
use crate::container::registry::ServiceRegistry;
use crate::container::resolver::DependencyResolver;
use crate::container::scope::{RequestId, ScopedServiceManager, ServiceScope};
use crate::container::tokens::ServiceToken;
use crate::errors::CoreError;

/// Dependency injection container with transient, request and singleton scopes
///
/// Lifecycle: construct once at startup, register every service, call
/// [`Container::instantiate_all_singletons`] (which closes registration), then
/// share the container behind an `Arc` and open one [`RequestLifetime`] per
/// request.
///
/// Resolution runs in two phases. Discovery walks the dependency graph from
/// the requested key, stopping at services already cached for their scope,
/// and fails on cycles, unregistered dependencies, scope violations and
/// request scoped services requested outside a lifetime. Construction then
/// builds the remaining services leaves first and caches each one according
/// to its own scope. A transient service referenced more than once within a
/// single resolution is built once for that resolution.
pub struct Container {
    registry: ServiceRegistry,
    singletons: RwLock<HashMap<ServiceKey, ServiceInstance>>,
    requests: RwLock<HashMap<RequestId, ScopedServiceManager>>,
    sealed: AtomicBool,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.registry.service_count())
            .field("singletons", &self.singleton_count())
            .field("active_requests", &self.active_request_count())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self {
            registry: ServiceRegistry::new(),
            singletons: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Register a service definition, replacing any previous one for its key
    pub fn register(&mut self, descriptor: ServiceDescriptor) -> Result<&mut Self, CoreError> {
        if self.is_sealed() {
            return Err(CoreError::RegistrationClosed {
                service: descriptor.key.to_string(),
            });
        }

        let key = descriptor.key.clone();
        let scope = descriptor.scope;
        if self.registry.register(descriptor).is_some() {
            tracing::debug!("Replaced registration for '{}' ({})", key, scope);
        } else {
            tracing::debug!("Registered '{}' ({})", key, scope);
        }

        Ok(self)
    }

    /// Register a factory under `key` with its ordered dependency keys
    pub fn register_factory<T, F>(
        &mut self,
        key: impl Into<ServiceKey>,
        scope: ServiceScope,
        dependencies: Vec<ServiceKey>,
        factory: F,
    ) -> Result<&mut Self, CoreError>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolvedDependencies) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::new(key, scope, dependencies, factory))
    }

    /// Register an [`Injectable`] under its own key
    pub fn register_injectable<T: Injectable>(
        &mut self,
        scope: ServiceScope,
    ) -> Result<&mut Self, CoreError> {
        self.register_injectable_as::<T>(scope, T::service_key())
    }

    /// Register an [`Injectable`] under an explicit key
    pub fn register_injectable_as<T: Injectable>(
        &mut self,
        scope: ServiceScope,
        key: impl Into<ServiceKey>,
    ) -> Result<&mut Self, CoreError> {
        self.register(ServiceDescriptor::new(key, scope, T::dependencies(), T::create))
    }

    /// Register the implementation behind a [`ServiceToken`]
    pub fn register_token<Token, F>(
        &mut self,
        scope: ServiceScope,
        dependencies: Vec<ServiceKey>,
        factory: F,
    ) -> Result<&mut Self, CoreError>
    where
        Token: ServiceToken,
        F: Fn(&ResolvedDependencies) -> Result<Arc<Token::Service>, CoreError>
            + Send
            + Sync
            + 'static,
    {
        self.register(ServiceDescriptor::token::<Token, F>(scope, dependencies, factory))
    }

    /// Look up a registered definition
    pub fn lookup(&self, key: &ServiceKey) -> Option<&Arc<ServiceDescriptor>> {
        self.registry.lookup(key)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registry.contains(key)
    }

    /// Get the number of registered services
    pub fn service_count(&self) -> usize {
        self.registry.service_count()
    }

    /// Whether registration has been closed
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Resolve a service, optionally within a request lifetime
    ///
    /// Returns `Ok(None)` when `key` itself is not registered. A registered
    /// service whose graph cannot be built is an error.
    pub fn resolve(
        &self,
        key: impl Into<ServiceKey>,
        request_id: Option<RequestId>,
    ) -> Result<Option<ServiceInstance>, CoreError> {
        let key = key.into();

        let root = match self.registry.lookup(&key) {
            Some(root) => root,
            None => {
                tracing::debug!("No registration for '{}'", key);
                return Ok(None);
            }
        };

        if let Some(instance) = self.cached(root, request_id)? {
            tracing::debug!("Cache hit for '{}' ({})", key, root.scope);
            return Ok(Some(instance));
        }

        if let Some(id) = request_id {
            if !self.is_request_active(id)? {
                tracing::warn!(
                    "Resolving '{}' against ended request lifetime {}; using a fresh request scope",
                    key,
                    id
                );
            }
        }

        let probe = |descriptor: &ServiceDescriptor| self.cached(descriptor, request_id);
        let plan = DependencyResolver::new(&self.registry)
            .with_request_context(request_id.is_some())
            .with_cache_probe(&probe)
            .plan(&key)?;

        let mut resolved = plan.cached;
        for descriptor in plan.order {
            let entries = descriptor
                .dependencies
                .iter()
                .map(|dependency| {
                    resolved
                        .get(dependency)
                        .map(|instance| (dependency.clone(), instance.clone()))
                        .ok_or_else(|| CoreError::UnresolvedDependency {
                            dependency: dependency.to_string(),
                            requested_by: descriptor.key.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, CoreError>>()?;

            let deps = ResolvedDependencies::new(descriptor.key.clone(), entries);
            let instance = (descriptor.factory)(&deps)?;
            tracing::debug!("Constructed '{}' ({})", descriptor.key, descriptor.scope);

            let instance = self.store(&descriptor, instance, request_id)?;
            resolved.insert(descriptor.key.clone(), instance);
        }

        Ok(resolved.remove(&key))
    }

    /// Resolve and downcast outside any request lifetime
    pub fn resolve_as<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve_typed::<T>(key.into(), None)
    }

    /// Resolve an [`Injectable`] by its own key outside any request lifetime
    pub fn resolve_injectable<T: Injectable>(&self) -> Result<Option<Arc<T>>, CoreError> {
        self.resolve_typed::<T>(T::service_key(), None)
    }

    /// Resolve a token service outside any request lifetime
    pub fn resolve_token<Token: ServiceToken>(
        &self,
    ) -> Result<Option<Arc<Token::Service>>, CoreError> {
        self.resolve_token_in::<Token>(None)
    }

    pub(crate) fn resolve_typed<T: Send + Sync + 'static>(
        &self,
        key: ServiceKey,
        request_id: Option<RequestId>,
    ) -> Result<Option<Arc<T>>, CoreError> {
        match self.resolve(key.clone(), request_id)? {
            Some(instance) => downcast::<T>(&key, instance).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn resolve_token_in<Token: ServiceToken>(
        &self,
        request_id: Option<RequestId>,
    ) -> Result<Option<Arc<Token::Service>>, CoreError> {
        let holder = self.resolve_typed::<Arc<Token::Service>>(Token::key(), request_id)?;
        Ok(holder.map(|holder| (*holder).clone()))
    }

    /// Construct every singleton and close registration
    ///
    /// Run once at startup, before requests are served, so configuration
    /// errors in singleton graphs surface at boot.
    pub fn instantiate_all_singletons(&self) -> Result<(), CoreError> {
        let keys = self.registry.keys_with_scope(ServiceScope::Singleton);
        for key in &keys {
            self.resolve(key, None)?;
        }

        self.sealed.store(true, Ordering::Release);
        tracing::info!("Instantiated {} singleton services", keys.len());
        Ok(())
    }

    /// Check every registered graph without constructing anything
    ///
    /// Surfaces cycles, unregistered dependencies and scope violations in
    /// graphs that are only reachable from request or transient roots.
    pub fn validate(&self) -> Result<(), CoreError> {
        let keys = self.registry.keys();
        let plan = DependencyResolver::new(&self.registry).plan_all(&keys)?;
        tracing::info!(
            "Validated {} service registrations ({} in construction order)",
            keys.len(),
            plan.construction_order().len()
        );
        Ok(())
    }

    /// Open a new request lifetime with an empty request cache
    pub fn new_request_lifetime(self: &Arc<Self>) -> Result<RequestLifetime, CoreError> {
        let request_id = RequestId::new();

        let mut requests = self
            .requests
            .write()
            .map_err(|_| CoreError::lock("request_caches"))?;
        requests.insert(request_id, ScopedServiceManager::with_id(request_id));
        drop(requests);

        tracing::debug!("Opened request lifetime {}", request_id);
        Ok(RequestLifetime::new(Arc::clone(self), request_id))
    }

    /// Discard a request's cached instances. Returns `false` if the lifetime
    /// was already ended.
    pub fn end_request_lifetime(&self, request_id: RequestId) -> bool {
        let removed = self
            .requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_id);

        match removed {
            Some(mut cache) => {
                let released = cache.service_count();
                cache.clear();
                tracing::debug!(
                    "Closed request lifetime {} ({} request services released)",
                    request_id,
                    released
                );
                true
            }
            None => false,
        }
    }

    /// Whether a request lifetime is still open
    pub fn is_request_active(&self, request_id: RequestId) -> Result<bool, CoreError> {
        let requests = self
            .requests
            .read()
            .map_err(|_| CoreError::lock("request_caches"))?;
        Ok(requests.contains_key(&request_id))
    }

    /// Number of open request lifetimes
    pub fn active_request_count(&self) -> usize {
        self.requests
            .read()
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Number of services cached for an open request lifetime
    pub fn request_service_count(&self, request_id: RequestId) -> Option<usize> {
        self.requests
            .read()
            .ok()?
            .get(&request_id)
            .map(ScopedServiceManager::service_count)
    }

    /// Number of constructed singletons
    pub fn singleton_count(&self) -> usize {
        self.singletons
            .read()
            .map(|singletons| singletons.len())
            .unwrap_or(0)
    }

    fn cached(
        &self,
        descriptor: &ServiceDescriptor,
        request_id: Option<RequestId>,
    ) -> Result<Option<ServiceInstance>, CoreError> {
        match descriptor.scope {
            ServiceScope::Singleton => {
                let singletons = self
                    .singletons
                    .read()
                    .map_err(|_| CoreError::lock("singleton_cache"))?;
                Ok(singletons.get(&descriptor.key).cloned())
            }
            ServiceScope::Request => {
                let Some(request_id) = request_id else {
                    return Ok(None);
                };
                let requests = self
                    .requests
                    .read()
                    .map_err(|_| CoreError::lock("request_caches"))?;
                Ok(requests
                    .get(&request_id)
                    .and_then(|cache| cache.get(&descriptor.key)))
            }
            ServiceScope::Transient => Ok(None),
        }
    }

    fn store(
        &self,
        descriptor: &ServiceDescriptor,
        instance: ServiceInstance,
        request_id: Option<RequestId>,
    ) -> Result<ServiceInstance, CoreError> {
        match descriptor.scope {
            ServiceScope::Singleton => {
                let mut singletons = self
                    .singletons
                    .write()
                    .map_err(|_| CoreError::lock("singleton_cache"))?;
                Ok(singletons
                    .entry(descriptor.key.clone())
                    .or_insert(instance)
                    .clone())
            }
            ServiceScope::Request => {
                let Some(request_id) = request_id else {
                    return Ok(instance);
                };
                let mut requests = self
                    .requests
                    .write()
                    .map_err(|_| CoreError::lock("request_caches"))?;
                match requests.get_mut(&request_id) {
                    Some(cache) => Ok(cache.insert_if_absent(descriptor.key.clone(), instance)),
                    // Ended lifetime: the instance lives for this resolution only
                    None => Ok(instance),
                }
            }
            ServiceScope::Transient => Ok(instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Counter {
        id: usize,
    }

    fn counting_factory(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(&ResolvedDependencies) -> Result<Counter, CoreError> + Send + Sync + 'static {
        move |_| {
            Ok(Counter {
                id: counter.fetch_add(1, Ordering::SeqCst),
            })
        }
    }

    fn container_with(key: &str, scope: ServiceScope) -> (Arc<Container>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut container = Container::new();
        container
            .register_factory(key, scope, Vec::new(), counting_factory(counter.clone()))
            .unwrap();
        (Arc::new(container), counter)
    }

    #[test]
    fn test_singleton_arc_sharing() {
        let (container, counter) = container_with("Config", ServiceScope::Singleton);

        let first = container.resolve("Config", None).unwrap().unwrap();
        let second = container.resolve("Config", None).unwrap().unwrap();
        let lifetime = container.new_request_lifetime().unwrap();
        let third = lifetime.resolve("Config").unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_behavior() {
        let (container, counter) = container_with("Builder", ServiceScope::Transient);

        let first = container.resolve_as::<Counter>("Builder").unwrap().unwrap();
        let second = container.resolve_as::<Counter>("Builder").unwrap().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.id, second.id);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_scope_requires_lifetime() {
        let (container, _) = container_with("Session", ServiceScope::Request);

        let error = container.resolve("Session", None).unwrap_err();
        assert!(error.is_missing_request_context());
        assert!(error.to_string().contains("Session"));
    }

    #[test]
    fn test_unregistered_root_returns_none() {
        let container = Container::new();
        assert!(container.resolve("NeverRegisteredKey", None).unwrap().is_none());
        assert!(container.resolve_as::<Counter>("NeverRegisteredKey").unwrap().is_none());
    }

    #[test]
    fn test_type_mismatch_on_wrong_downcast() {
        let (container, _) = container_with("Config", ServiceScope::Singleton);

        let error = container.resolve_as::<String>("Config").unwrap_err();
        assert!(matches!(error, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_factory_error_propagates_and_nothing_is_cached() {
        let mut container = Container::new();
        container
            .register_factory::<Counter, _>("Broken", ServiceScope::Singleton, Vec::new(), |_| {
                Err(CoreError::initialization("Broken", "database unreachable"))
            })
            .unwrap();

        let error = container.instantiate_all_singletons().unwrap_err();
        assert!(error.to_string().contains("database unreachable"));
        assert_eq!(container.singleton_count(), 0);
        assert!(!container.is_sealed());
    }

    #[test]
    fn test_registration_closed_after_singletons() {
        let (container, _) = container_with("Config", ServiceScope::Singleton);
        let mut container = Arc::try_unwrap(container).unwrap();

        container.instantiate_all_singletons().unwrap();
        assert!(container.is_sealed());
        assert_eq!(container.singleton_count(), 1);

        let error = container
            .register_factory("Late", ServiceScope::Transient, Vec::new(), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(error, CoreError::RegistrationClosed { .. }));
    }

    #[test]
    fn test_end_request_lifetime_is_idempotent() {
        let (container, _) = container_with("Session", ServiceScope::Request);
        let lifetime = container.new_request_lifetime().unwrap();
        let id = lifetime.request_id();

        lifetime.resolve("Session").unwrap().unwrap();
        assert_eq!(container.request_service_count(id), Some(1));

        assert!(container.end_request_lifetime(id));
        assert!(!container.end_request_lifetime(id));
        assert_eq!(container.request_service_count(id), None);
        assert_eq!(container.active_request_count(), 0);
    }

    #[test]
    fn test_validate_reports_problems_in_request_graphs() {
        let mut container = Container::new();
        container
            .register_factory("Controller", ServiceScope::Request, vec!["Helper".into()], |_| Ok(()))
            .unwrap()
            .register_factory("Helper", ServiceScope::Transient, Vec::new(), |_| Ok(()))
            .unwrap();

        // No singletons, so eager instantiation has nothing to catch
        container.instantiate_all_singletons().unwrap();

        let error = container.validate().unwrap_err();
        assert!(error.is_scope_violation());
    }
}
