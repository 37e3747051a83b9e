#[allow(clippy::module_inception)]
pub mod container;
pub mod autowiring;
pub mod descriptor;
pub mod lifetime;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod tokens;

pub use autowiring::Injectable;
pub use container::Container;
pub use descriptor::{ResolvedDependencies, ServiceDescriptor, ServiceFactory, ServiceInstance, ServiceKey};
pub use lifetime::RequestLifetime;
pub use registry::ServiceRegistry;
pub use resolver::{DependencyResolver, ResolutionPath, ResolutionPlan};
pub use scope::{RequestId, ScopedServiceManager, ServiceScope};
pub use tokens::ServiceToken;
