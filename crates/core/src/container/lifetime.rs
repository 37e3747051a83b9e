use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::container::autowiring::Injectable;
use crate::container::container::Container;
use crate::container::descriptor::{ServiceInstance, ServiceKey};
use crate::container::scope::RequestId;
use crate::container::tokens::ServiceToken;
use crate::errors::CoreError;

/// Resolution context for a single request
///
/// Request scoped services resolved through the same lifetime are shared;
/// separate lifetimes never see each other's instances. The lifetime is ended
/// by [`RequestLifetime::end`] or, at the latest, when the handle is dropped,
/// so request caches are released on every exit path.
pub struct RequestLifetime {
    container: Arc<Container>,
    request_id: RequestId,
    ended: AtomicBool,
}

impl RequestLifetime {
    pub(crate) fn new(container: Arc<Container>, request_id: RequestId) -> Self {
        Self {
            container,
            request_id,
            ended: AtomicBool::new(false),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Resolve a service within this request
    pub fn resolve(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<Option<ServiceInstance>, CoreError> {
        self.container.resolve(key, Some(self.request_id))
    }

    /// Resolve and downcast a service within this request
    pub fn resolve_as<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<Option<Arc<T>>, CoreError> {
        self.container.resolve_typed::<T>(key.into(), Some(self.request_id))
    }

    /// Resolve an [`Injectable`] by its own key within this request
    pub fn resolve_injectable<T: Injectable>(&self) -> Result<Option<Arc<T>>, CoreError> {
        self.container
            .resolve_typed::<T>(T::service_key(), Some(self.request_id))
    }

    /// Resolve a token service within this request
    pub fn resolve_token<Token: ServiceToken>(
        &self,
    ) -> Result<Option<Arc<Token::Service>>, CoreError> {
        self.container.resolve_token_in::<Token>(Some(self.request_id))
    }

    /// Release this request's cached instances. Calling it again is a no-op.
    pub fn end(&self) {
        if !self.ended.swap(true, Ordering::AcqRel) {
            self.container.end_request_lifetime(self.request_id);
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }
}

impl Drop for RequestLifetime {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for RequestLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifetime")
            .field("request_id", &self.request_id)
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::scope::ServiceScope;

    struct Session;

    fn container() -> Arc<Container> {
        let mut container = Container::new();
        container
            .register_factory("Session", ServiceScope::Request, Vec::new(), |_| Ok(Session))
            .unwrap();
        Arc::new(container)
    }

    #[test]
    fn test_same_lifetime_shares_request_instances() {
        let container = container();
        let lifetime = container.new_request_lifetime().unwrap();

        let first = lifetime.resolve_as::<Session>("Session").unwrap().unwrap();
        let second = lifetime.resolve_as::<Session>("Session").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_distinct_lifetimes_are_isolated() {
        let container = container();
        let a = container.new_request_lifetime().unwrap();
        let b = container.new_request_lifetime().unwrap();
        assert_ne!(a.request_id(), b.request_id());

        let from_a = a.resolve_as::<Session>("Session").unwrap().unwrap();
        let from_b = b.resolve_as::<Session>("Session").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&from_a, &from_b));
    }

    #[test]
    fn test_drop_ends_lifetime() {
        let container = container();
        {
            let lifetime = container.new_request_lifetime().unwrap();
            lifetime.resolve("Session").unwrap();
            assert_eq!(container.active_request_count(), 1);
        }
        assert_eq!(container.active_request_count(), 0);
    }

    #[test]
    fn test_double_end_is_noop() {
        let container = container();
        let lifetime = container.new_request_lifetime().unwrap();

        lifetime.end();
        assert!(lifetime.is_ended());
        lifetime.end();
        drop(lifetime);
        assert_eq!(container.active_request_count(), 0);
    }

    #[test]
    fn test_resolve_after_end_uses_fresh_unpersisted_scope() {
        let container = container();
        let lifetime = container.new_request_lifetime().unwrap();
        let before = lifetime.resolve_as::<Session>("Session").unwrap().unwrap();

        lifetime.end();

        let after = lifetime.resolve_as::<Session>("Session").unwrap().unwrap();
        let again = lifetime.resolve_as::<Session>("Session").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!Arc::ptr_eq(&after, &again));
        assert_eq!(container.active_request_count(), 0);
    }
}
