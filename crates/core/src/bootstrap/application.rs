use std::sync::Arc;

use crate::config::ApplicationConfig;
use crate::container::{
    Container, Injectable, ResolvedDependencies, ServiceDescriptor, ServiceKey, ServiceScope,
};
use crate::dispatch::ExecutionContainer;
use crate::errors::CoreError;

/// Builder for [`Application`]
pub struct ApplicationBuilder {
    config: ApplicationConfig,
    descriptors: Vec<ServiceDescriptor>,
    controllers: Vec<ServiceKey>,
}

impl ApplicationBuilder {
    pub fn new(config: ApplicationConfig) -> Self {
        Self {
            config,
            descriptors: Vec::new(),
            controllers: Vec::new(),
        }
    }

    /// Register an injectable service under its own key
    pub fn injectable<T: Injectable>(mut self, scope: ServiceScope) -> Self {
        self.descriptors.push(ServiceDescriptor::new(
            T::service_key(),
            scope,
            T::dependencies(),
            T::create,
        ));
        self
    }

    /// Register a controller in request scope
    pub fn controller<C: Injectable>(self) -> Self {
        self.controller_with_scope::<C>(ServiceScope::Request)
    }

    pub fn controller_with_scope<C: Injectable>(mut self, scope: ServiceScope) -> Self {
        self.controllers.push(C::service_key());
        self.injectable::<C>(scope)
    }

    /// Register a factory under an explicit key
    pub fn factory<T, F>(
        mut self,
        key: impl Into<ServiceKey>,
        scope: ServiceScope,
        dependencies: Vec<ServiceKey>,
        factory: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolvedDependencies) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        self.descriptors
            .push(ServiceDescriptor::new(key, scope, dependencies, factory));
        self
    }

    /// Register a prebuilt descriptor
    pub fn descriptor(mut self, descriptor: ServiceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Result<Application, CoreError> {
        let mut container = Container::new();
        for descriptor in self.descriptors {
            container.register(descriptor)?;
        }

        if self.config.validate_on_boot {
            container.validate()?;
        }

        container.instantiate_all_singletons()?;

        tracing::info!(
            "Application ready in {} mode: {} services, {} controllers, {} singletons",
            self.config.environment,
            container.service_count(),
            self.controllers.len(),
            container.singleton_count()
        );

        Ok(Application {
            container: Arc::new(container),
            config: self.config,
            controllers: self.controllers,
        })
    }
}

/// A booted application: a sealed container plus its controllers
#[derive(Debug)]
pub struct Application {
    container: Arc<Container>,
    config: ApplicationConfig,
    controllers: Vec<ServiceKey>,
}

impl Application {
    pub fn builder(config: ApplicationConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn controllers(&self) -> &[ServiceKey] {
        &self.controllers
    }

    /// Executor for the controller registered under `key`
    pub fn executor(&self, key: impl Into<ServiceKey>) -> ExecutionContainer {
        ExecutionContainer::new(Arc::clone(&self.container), key)
            .expose_error_details(self.config.expose_error_details)
    }
}
