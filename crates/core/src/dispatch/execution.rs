use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::container::{Container, RequestLifetime, ServiceKey};
use crate::dispatch::HttpException;
use crate::errors::CoreError;

/// Outcome of running one controller action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub status: u16,
    pub body: Value,
}

impl ExecutionResult {
    fn failure(exception: &HttpException) -> Self {
        Self {
            success: false,
            status: exception.status,
            body: exception.body(),
        }
    }
}

/// Runs controller actions inside their own request lifetime
///
/// Every call to [`ExecutionContainer::execute`] opens a fresh lifetime,
/// resolves the controller through it and ends it before returning, whether
/// the action succeeded or not.
#[derive(Debug, Clone)]
pub struct ExecutionContainer {
    container: Arc<Container>,
    controller_key: ServiceKey,
    default_status: u16,
    expose_error_details: bool,
}

impl ExecutionContainer {
    pub fn new(container: Arc<Container>, controller_key: impl Into<ServiceKey>) -> Self {
        Self {
            container,
            controller_key: controller_key.into(),
            default_status: 200,
            expose_error_details: false,
        }
    }

    /// Status used when an action returns a body
    pub fn with_default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    /// Include resolution error messages in 500 bodies
    pub fn expose_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    pub fn controller_key(&self) -> &ServiceKey {
        &self.controller_key
    }

    pub fn default_status(&self) -> u16 {
        self.default_status
    }

    /// Resolve the controller and run `action` against it
    pub async fn execute<C, F, Fut>(&self, action: F) -> ExecutionResult
    where
        C: Send + Sync + 'static,
        F: FnOnce(Arc<C>, Arc<RequestLifetime>) -> Fut,
        Fut: Future<Output = Result<Option<Value>, HttpException>>,
    {
        let lifetime = match self.container.new_request_lifetime() {
            Ok(lifetime) => Arc::new(lifetime),
            Err(error) => return ExecutionResult::failure(&self.internal_error(&error)),
        };

        let result = match self.resolve_controller::<C>(&lifetime) {
            Ok(controller) => self.run(controller, Arc::clone(&lifetime), action).await,
            Err(exception) => ExecutionResult::failure(&exception),
        };

        lifetime.end();
        result
    }

    fn resolve_controller<C: Send + Sync + 'static>(
        &self,
        lifetime: &RequestLifetime,
    ) -> Result<Arc<C>, HttpException> {
        match lifetime.resolve_as::<C>(&self.controller_key) {
            Ok(Some(controller)) => Ok(controller),
            Ok(None) => {
                tracing::error!("Controller '{}' is not registered", self.controller_key);
                let message = format!("Controller '{}' is not registered", self.controller_key);
                Err(self.internal_message(&message))
            }
            Err(error) => Err(self.internal_error(&error)),
        }
    }

    async fn run<C, F, Fut>(
        &self,
        controller: Arc<C>,
        lifetime: Arc<RequestLifetime>,
        action: F,
    ) -> ExecutionResult
    where
        F: FnOnce(Arc<C>, Arc<RequestLifetime>) -> Fut,
        Fut: Future<Output = Result<Option<Value>, HttpException>>,
    {
        match action(controller, lifetime).await {
            Ok(Some(body)) => ExecutionResult {
                success: true,
                status: self.default_status,
                body,
            },
            Ok(None) => ExecutionResult {
                success: true,
                status: 204,
                body: Value::Null,
            },
            Err(exception) => {
                if exception.status >= 500 {
                    tracing::error!("Action on '{}' failed: {}", self.controller_key, exception);
                } else {
                    tracing::debug!("Action on '{}' raised {}", self.controller_key, exception);
                }
                ExecutionResult::failure(&exception)
            }
        }
    }

    fn internal_error(&self, error: &CoreError) -> HttpException {
        tracing::error!(
            "Failed to resolve controller '{}': {}",
            self.controller_key,
            error
        );
        self.internal_message(&error.to_string())
    }

    fn internal_message(&self, message: &str) -> HttpException {
        if self.expose_error_details {
            HttpException::internal_server_error(Some(message))
        } else {
            HttpException::internal_server_error(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ServiceScope;
    use serde_json::json;

    struct Greeter {
        name: String,
    }

    struct Session;

    fn container() -> Arc<Container> {
        let mut container = Container::new();
        container
            .register_factory("Greeter", ServiceScope::Request, Vec::new(), |_| {
                Ok(Greeter {
                    name: "dactyl".to_string(),
                })
            })
            .unwrap()
            .register_factory("Session", ServiceScope::Request, Vec::new(), |_| Ok(Session))
            .unwrap();
        Arc::new(container)
    }

    #[tokio::test]
    async fn test_body_uses_default_status() {
        let executor = ExecutionContainer::new(container(), "Greeter").with_default_status(201);

        let result = executor
            .execute(|greeter: Arc<Greeter>, _| async move {
                Ok(Some(json!({ "hello": greeter.name })))
            })
            .await;

        assert!(result.success);
        assert_eq!(result.status, 201);
        assert_eq!(result.body, json!({ "hello": "dactyl" }));
    }

    #[tokio::test]
    async fn test_no_body_is_204() {
        let executor = ExecutionContainer::new(container(), "Greeter");

        let result = executor
            .execute(|_: Arc<Greeter>, _| async { Ok(None) })
            .await;

        assert!(result.success);
        assert_eq!(result.status, 204);
        assert_eq!(result.body, Value::Null);
    }

    #[tokio::test]
    async fn test_http_exception_maps_to_its_status() {
        let container = container();
        let executor = ExecutionContainer::new(Arc::clone(&container), "Greeter");

        let result = executor
            .execute(|_: Arc<Greeter>, _| async {
                Err(HttpException::forbidden(Some("nope")))
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.status, 403);
        assert_eq!(result.body, json!({ "error": "nope", "status": 403 }));
        assert_eq!(container.active_request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_controller_is_500() {
        let container = container();
        let executor = ExecutionContainer::new(Arc::clone(&container), "Missing");

        let result = executor
            .execute(|_: Arc<Greeter>, _| async { Ok(None) })
            .await;

        assert_eq!(result.status, 500);
        assert_eq!(result.body["error"], "Internal Server Error");
        assert_eq!(container.active_request_count(), 0);
    }

    #[tokio::test]
    async fn test_exposed_details_include_message() {
        let executor = ExecutionContainer::new(container(), "Greeter").expose_error_details(true);

        let result = executor
            .execute(|_: Arc<Session>, _| async { Ok(None) })
            .await;

        assert_eq!(result.status, 500);
        assert!(result.body["error"].as_str().unwrap().contains("Greeter"));
    }

    #[tokio::test]
    async fn test_action_shares_request_scope_with_controller() {
        let container = container();
        let executor = ExecutionContainer::new(Arc::clone(&container), "Greeter");

        let result = executor
            .execute(|_: Arc<Greeter>, lifetime| async move {
                let first = lifetime.resolve_as::<Session>("Session")?.unwrap();
                let second = lifetime.resolve_as::<Session>("Session")?.unwrap();
                Ok(Some(json!({ "shared": Arc::ptr_eq(&first, &second) })))
            })
            .await;

        assert_eq!(result.body, json!({ "shared": true }));
        assert_eq!(container.active_request_count(), 0);
    }
}
