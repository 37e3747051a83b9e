use std::any::Any;
use std::sync::Arc;

use crate::container::scope::ServiceScope;
use crate::container::tokens::ServiceToken;
use crate::errors::CoreError;

/// A constructed, shareable service instance
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Factory function building an instance from its resolved dependencies
pub type ServiceFactory =
    Arc<dyn Fn(&ResolvedDependencies) -> Result<ServiceInstance, CoreError> + Send + Sync>;

/// Registration key of a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key derived from a type's declared name, e.g. `UserService` for
    /// `my_app::services::UserService<Db>`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(short_type_name(std::any::type_name::<T>()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ServiceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&ServiceKey> for ServiceKey {
    fn from(key: &ServiceKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Service descriptor containing all metadata for a service
///
/// Immutable once registered; the container shares it behind an `Arc`.
pub struct ServiceDescriptor {
    /// Registration key
    pub key: ServiceKey,
    /// Service lifetime/scope
    pub scope: ServiceScope,
    /// Constructor parameters, in order
    pub dependencies: Vec<ServiceKey>,
    /// Name of the concrete type produced by the factory
    pub type_name: &'static str,
    /// Strategy for creating instances
    pub factory: ServiceFactory,
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .field("type_name", &self.type_name)
            .field("factory", &"<factory_fn>")
            .finish()
    }
}

impl ServiceDescriptor {
    /// Create a descriptor from a typed factory
    pub fn new<T, F>(
        key: impl Into<ServiceKey>,
        scope: ServiceScope,
        dependencies: Vec<ServiceKey>,
        factory: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolvedDependencies) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            scope,
            dependencies,
            type_name: std::any::type_name::<T>(),
            factory: Arc::new(move |deps| {
                let instance = factory(deps)?;
                Ok(Arc::new(instance) as ServiceInstance)
            }),
        }
    }

    /// Create a descriptor for a service resolved through a [`ServiceToken`]
    pub fn token<Token, F>(scope: ServiceScope, dependencies: Vec<ServiceKey>, factory: F) -> Self
    where
        Token: ServiceToken,
        F: Fn(&ResolvedDependencies) -> Result<Arc<Token::Service>, CoreError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            key: Token::key(),
            scope,
            dependencies,
            type_name: Token::service_type_name(),
            factory: Arc::new(move |deps| {
                let service = factory(deps)?;
                Ok(Arc::new(service) as ServiceInstance)
            }),
        }
    }

    /// Check if the service depends on `key` directly
    pub fn depends_on(&self, key: &ServiceKey) -> bool {
        self.dependencies.contains(key)
    }
}

/// Already constructed constructor arguments, in declared parameter order
pub struct ResolvedDependencies {
    owner: ServiceKey,
    entries: Vec<(ServiceKey, ServiceInstance)>,
}

impl ResolvedDependencies {
    pub(crate) fn new(owner: ServiceKey, entries: Vec<(ServiceKey, ServiceInstance)>) -> Self {
        Self { owner, entries }
    }

    /// Key of the service being constructed
    pub fn owner(&self) -> &ServiceKey {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Untyped argument at `index`
    pub fn instance(&self, index: usize) -> Result<ServiceInstance, CoreError> {
        self.entries
            .get(index)
            .map(|(_, instance)| instance.clone())
            .ok_or_else(|| CoreError::UnresolvedDependency {
                dependency: format!("parameter #{}", index),
                requested_by: self.owner.to_string(),
            })
    }

    /// Typed argument at `index`
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, CoreError> {
        let (key, instance) = self.entries.get(index).ok_or_else(|| {
            CoreError::UnresolvedDependency {
                dependency: format!("parameter #{}", index),
                requested_by: self.owner.to_string(),
            }
        })?;
        downcast::<T>(key, instance.clone())
    }

    /// Typed argument registered under `key`
    pub fn get_by_key<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<Arc<T>, CoreError> {
        let key = key.into();
        let (_, instance) = self
            .entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .ok_or_else(|| CoreError::UnresolvedDependency {
                dependency: key.to_string(),
                requested_by: self.owner.to_string(),
            })?;
        downcast::<T>(&key, instance.clone())
    }

    /// Token service argument at `index`
    pub fn token<Token: ServiceToken>(&self, index: usize) -> Result<Arc<Token::Service>, CoreError> {
        let holder = self.get::<Arc<Token::Service>>(index)?;
        Ok((*holder).clone())
    }
}

impl std::fmt::Debug for ResolvedDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedDependencies")
            .field("owner", &self.owner)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(
    key: &ServiceKey,
    instance: ServiceInstance,
) -> Result<Arc<T>, CoreError> {
    instance
        .downcast::<T>()
        .map_err(|_| CoreError::TypeMismatch {
            service: key.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
}
