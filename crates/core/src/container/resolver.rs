use std::collections::HashMap;
use std::sync::Arc;

use crate::container::descriptor::{ServiceDescriptor, ServiceInstance, ServiceKey};
use crate::container::registry::ServiceRegistry;
use crate::errors::CoreError;

/// Dependency resolution path for error reporting
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    pub services: Vec<ServiceKey>,
}

impl ResolutionPath {
    /// Create a new resolution path
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service to the resolution path
    pub fn push(&mut self, key: ServiceKey) {
        self.services.push(key);
    }

    /// Remove the last service from the resolution path
    pub fn pop(&mut self) -> Option<ServiceKey> {
        self.services.pop()
    }

    /// Check if the path contains a service
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.services.contains(key)
    }

    /// Get the path as a string for error messages
    pub fn path_string(&self) -> String {
        self.services
            .iter()
            .map(ServiceKey::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// The closed cycle ending at `key`, e.g. `B -> C -> B` for path
    /// `A -> B -> C` re-entering `B`
    pub fn cycle_to(&self, key: &ServiceKey) -> ResolutionPath {
        let start = self
            .services
            .iter()
            .position(|candidate| candidate == key)
            .unwrap_or(0);
        let mut services = self.services[start..].to_vec();
        services.push(key.clone());
        ResolutionPath { services }
    }
}

/// Outcome of the discovery phase for one root
#[derive(Debug, Default)]
pub struct ResolutionPlan {
    /// Definitions to construct, leaves first
    pub(crate) order: Vec<Arc<ServiceDescriptor>>,
    /// Instances found in a scope cache during discovery
    pub(crate) cached: HashMap<ServiceKey, ServiceInstance>,
}

impl ResolutionPlan {
    /// Keys to construct, in construction order
    pub fn construction_order(&self) -> Vec<&ServiceKey> {
        self.order.iter().map(|descriptor| &descriptor.key).collect()
    }

    /// Keys satisfied from a cache without construction
    pub fn cached_keys(&self) -> Vec<&ServiceKey> {
        let mut keys: Vec<&ServiceKey> = self.cached.keys().collect();
        keys.sort();
        keys
    }

    /// Nothing left to construct
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Cache lookup used during discovery. Returning an instance marks the
/// service as satisfied and its subtree is not walked.
pub type CacheProbe<'a> =
    &'a dyn Fn(&ServiceDescriptor) -> Result<Option<ServiceInstance>, CoreError>;

/// Walks a service's dependency graph and produces a [`ResolutionPlan`]
///
/// Every key is visited at most once. A key seen again while still on the
/// current path is a cycle and is reported with its exact path. Scope
/// monotonicity is checked for each definition against its immediate
/// children before the children are walked. The walk keeps its own stack,
/// so long registration chains do not grow the call stack.
pub struct DependencyResolver<'a> {
    registry: &'a ServiceRegistry,
    request_context: bool,
    probe: Option<CacheProbe<'a>>,
    states: HashMap<ServiceKey, VisitState>,
    path: ResolutionPath,
    plan: ResolutionPlan,
}

impl<'a> DependencyResolver<'a> {
    /// Resolver with request context assumed and no caches consulted
    pub fn new(registry: &'a ServiceRegistry) -> Self {
        Self {
            registry,
            request_context: true,
            probe: None,
            states: HashMap::new(),
            path: ResolutionPath::new(),
            plan: ResolutionPlan::default(),
        }
    }

    /// Whether request scoped services may be planned
    pub fn with_request_context(mut self, request_context: bool) -> Self {
        self.request_context = request_context;
        self
    }

    /// Consult scope caches while walking
    pub fn with_cache_probe(mut self, probe: CacheProbe<'a>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Plan the construction of `root`
    pub fn plan(mut self, root: &ServiceKey) -> Result<ResolutionPlan, CoreError> {
        self.walk(root)?;
        Ok(self.plan)
    }

    /// Plan several roots at once; shared services appear once
    pub fn plan_all<'k>(
        mut self,
        roots: impl IntoIterator<Item = &'k ServiceKey>,
    ) -> Result<ResolutionPlan, CoreError> {
        for root in roots {
            self.walk(root)?;
        }
        Ok(self.plan)
    }

    /// Depth-first walk on an explicit stack of (definition, next child)
    /// frames, so chain length is bounded by heap rather than call depth
    fn walk(&mut self, root: &ServiceKey) -> Result<(), CoreError> {
        let mut stack: Vec<(Arc<ServiceDescriptor>, usize)> = Vec::new();
        if let Some(descriptor) = self.enter(root, None)? {
            stack.push((descriptor, 0));
        }

        while let Some((descriptor, next)) = stack.last_mut() {
            match descriptor.dependencies.get(*next).cloned() {
                Some(dependency) => {
                    *next += 1;
                    let parent = descriptor.key.clone();
                    if let Some(child) = self.enter(&dependency, Some(&parent))? {
                        stack.push((child, 0));
                    }
                }
                None => {
                    if let Some((descriptor, _)) = stack.pop() {
                        self.path.pop();
                        self.states.insert(descriptor.key.clone(), VisitState::Done);
                        self.plan.order.push(descriptor);
                    }
                }
            }
        }

        Ok(())
    }

    /// Checks a key on first sight. Returns the definition when its children
    /// still have to be walked.
    fn enter(
        &mut self,
        key: &ServiceKey,
        requested_by: Option<&ServiceKey>,
    ) -> Result<Option<Arc<ServiceDescriptor>>, CoreError> {
        match self.states.get(key) {
            Some(VisitState::Done) => return Ok(None),
            Some(VisitState::InProgress) => {
                let cycle = self.path.cycle_to(key);
                return Err(CoreError::CircularDependency {
                    path: cycle.path_string(),
                    cycle_service: key.to_string(),
                });
            }
            None => {}
        }

        let descriptor = self
            .registry
            .lookup(key)
            .cloned()
            .ok_or_else(|| CoreError::UnresolvedDependency {
                dependency: key.to_string(),
                requested_by: requested_by
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<root>".to_string()),
            })?;

        if let Some(probe) = self.probe {
            if let Some(instance) = probe(descriptor.as_ref())? {
                self.states.insert(key.clone(), VisitState::Done);
                self.plan.cached.insert(key.clone(), instance);
                return Ok(None);
            }
        }

        if descriptor.scope.is_request() && !self.request_context {
            return Err(CoreError::MissingRequestContext {
                service: key.to_string(),
            });
        }

        self.check_scopes(&descriptor)?;

        self.states.insert(key.clone(), VisitState::InProgress);
        self.path.push(key.clone());

        Ok(Some(descriptor))
    }

    fn check_scopes(&self, descriptor: &ServiceDescriptor) -> Result<(), CoreError> {
        let mut narrower = Vec::new();

        for dependency in &descriptor.dependencies {
            let child = self.registry.lookup(dependency).ok_or_else(|| {
                CoreError::UnresolvedDependency {
                    dependency: dependency.to_string(),
                    requested_by: descriptor.key.to_string(),
                }
            })?;

            if !descriptor.scope.can_depend_on(child.scope) {
                narrower.push(format!("{}({})", child.key, child.scope));
            }
        }

        if narrower.is_empty() {
            return Ok(());
        }

        Err(CoreError::ScopeViolation {
            parent: descriptor.key.to_string(),
            parent_scope: descriptor.scope,
            children: narrower.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::scope::ServiceScope;

    fn register(registry: &mut ServiceRegistry, key: &str, scope: ServiceScope, deps: &[&str]) {
        registry.register(ServiceDescriptor::new(
            key,
            scope,
            deps.iter().map(|dep| ServiceKey::from(*dep)).collect(),
            |_| Ok(()),
        ));
    }

    fn keys(plan: &ResolutionPlan) -> Vec<&str> {
        plan.construction_order().into_iter().map(ServiceKey::as_str).collect()
    }

    #[test]
    fn test_plan_orders_leaves_first_and_dedupes_shared_nodes() {
        let mut registry = ServiceRegistry::new();
        // Diamond: Root -> (Left, Right) -> Leaf
        register(&mut registry, "Root", ServiceScope::Transient, &["Left", "Right"]);
        register(&mut registry, "Left", ServiceScope::Transient, &["Leaf"]);
        register(&mut registry, "Right", ServiceScope::Request, &["Leaf"]);
        register(&mut registry, "Leaf", ServiceScope::Singleton, &[]);

        let plan = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Root"))
            .unwrap();

        assert_eq!(keys(&plan), vec!["Leaf", "Left", "Right", "Root"]);
    }

    #[test]
    fn test_dependency_graph_cycle_detection() {
        let mut registry = ServiceRegistry::new();
        // Create cycle: A -> B -> C -> A
        register(&mut registry, "A", ServiceScope::Transient, &["B"]);
        register(&mut registry, "B", ServiceScope::Transient, &["C"]);
        register(&mut registry, "C", ServiceScope::Transient, &["A"]);

        let result = DependencyResolver::new(&registry).plan(&ServiceKey::from("A"));

        match result {
            Err(CoreError::CircularDependency { path, cycle_service }) => {
                assert_eq!(path, "A -> B -> C -> A");
                assert_eq!(cycle_service, "A");
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_path_excludes_acyclic_prefix() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Root", ServiceScope::Transient, &["B"]);
        register(&mut registry, "B", ServiceScope::Transient, &["C"]);
        register(&mut registry, "C", ServiceScope::Transient, &["B"]);

        let error = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Root"))
            .unwrap_err();

        match error {
            CoreError::CircularDependency { path, .. } => assert_eq!(path, "B -> C -> B"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Loop", ServiceScope::Singleton, &["Loop"]);

        let error = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Loop"))
            .unwrap_err();
        assert!(error.is_circular_dependency());
        assert!(error.to_string().contains("Loop -> Loop"));
    }

    #[test]
    fn test_unregistered_dependency_names_parent() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Controller", ServiceScope::Request, &["Mailer"]);

        let error = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Controller"))
            .unwrap_err();

        match error {
            CoreError::UnresolvedDependency { dependency, requested_by } => {
                assert_eq!(dependency, "Mailer");
                assert_eq!(requested_by, "Controller");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_scope_violation_lists_every_narrower_child() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Cache", ServiceScope::Singleton, &["Session", "Clock", "Buffer"]);
        register(&mut registry, "Session", ServiceScope::Request, &[]);
        register(&mut registry, "Clock", ServiceScope::Singleton, &[]);
        register(&mut registry, "Buffer", ServiceScope::Transient, &[]);

        let error = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Cache"))
            .unwrap_err();

        match error {
            CoreError::ScopeViolation { parent, parent_scope, children } => {
                assert_eq!(parent, "Cache");
                assert_eq!(parent_scope, ServiceScope::Singleton);
                assert_eq!(children, "Session(request), Buffer(transient)");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_request_service_requires_request_context() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Handler", ServiceScope::Transient, &["Session"]);
        register(&mut registry, "Session", ServiceScope::Request, &[]);

        let error = DependencyResolver::new(&registry)
            .with_request_context(false)
            .plan(&ServiceKey::from("Handler"))
            .unwrap_err();
        assert!(error.is_missing_request_context());

        let plan = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("Handler"))
            .unwrap();
        assert_eq!(keys(&plan), vec!["Session", "Handler"]);
    }

    #[test]
    fn test_cached_service_subtree_is_not_walked() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "Controller", ServiceScope::Request, &["Service"]);
        // Service's own dependency is missing; a cache hit must skip it
        register(&mut registry, "Service", ServiceScope::Singleton, &["Gone"]);

        let cached: ServiceInstance = Arc::new(());
        let probe = |descriptor: &ServiceDescriptor| -> Result<Option<ServiceInstance>, CoreError> {
            if descriptor.key.as_str() == "Service" {
                Ok(Some(cached.clone()))
            } else {
                Ok(None)
            }
        };

        let plan = DependencyResolver::new(&registry)
            .with_cache_probe(&probe)
            .plan(&ServiceKey::from("Controller"))
            .unwrap();

        assert_eq!(keys(&plan), vec!["Controller"]);
        assert_eq!(
            plan.cached_keys().into_iter().map(ServiceKey::as_str).collect::<Vec<_>>(),
            vec!["Service"]
        );
    }

    #[test]
    fn test_long_chain_does_not_exhaust_the_stack() {
        let mut registry = ServiceRegistry::new();
        let depth = 50_000;
        for i in 0..depth {
            let dep = format!("S{}", i + 1);
            let deps: Vec<&str> = if i + 1 < depth { vec![dep.as_str()] } else { Vec::new() };
            register(&mut registry, &format!("S{}", i), ServiceScope::Transient, &deps);
        }

        let plan = DependencyResolver::new(&registry)
            .plan(&ServiceKey::from("S0"))
            .unwrap();

        let order = keys(&plan);
        assert_eq!(order.len(), depth);
        assert_eq!(order[0], format!("S{}", depth - 1));
        assert_eq!(order[depth - 1], "S0");
    }

    #[test]
    fn test_plan_all_covers_every_root() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry, "A", ServiceScope::Request, &["C"]);
        register(&mut registry, "B", ServiceScope::Request, &["C"]);
        register(&mut registry, "C", ServiceScope::Singleton, &[]);

        let roots = registry.keys();
        let plan = DependencyResolver::new(&registry).plan_all(&roots).unwrap();
        assert_eq!(keys(&plan), vec!["C", "A", "B"]);
    }
}
