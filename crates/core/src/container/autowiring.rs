use crate::container::descriptor::{ResolvedDependencies, ServiceKey};
use crate::errors::CoreError;

/// Trait for services the container can construct by constructor injection
///
/// Dependencies are declared statically as an ordered list of keys; the
/// container hands them back, already built, to [`Injectable::create`] in the
/// same order.
///
/// ```rust
/// use dactyl_core::container::{Injectable, ResolvedDependencies, ServiceKey};
/// use dactyl_core::CoreError;
/// use std::sync::Arc;
///
/// struct Database;
///
/// impl Injectable for Database {
///     fn dependencies() -> Vec<ServiceKey> {
///         Vec::new()
///     }
///
///     fn create(_deps: &ResolvedDependencies) -> Result<Self, CoreError> {
///         Ok(Database)
///     }
/// }
///
/// struct UserRepository {
///     db: Arc<Database>,
/// }
///
/// impl Injectable for UserRepository {
///     fn dependencies() -> Vec<ServiceKey> {
///         vec![ServiceKey::of::<Database>()]
///     }
///
///     fn create(deps: &ResolvedDependencies) -> Result<Self, CoreError> {
///         Ok(UserRepository { db: deps.get(0)? })
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Registration key, defaults to the type's declared name
    fn service_key() -> ServiceKey {
        ServiceKey::of::<Self>()
    }

    /// Keys of the constructor parameters, in order
    fn dependencies() -> Vec<ServiceKey>;

    /// Construct an instance from its resolved dependencies
    fn create(deps: &ResolvedDependencies) -> Result<Self, CoreError>;
}
